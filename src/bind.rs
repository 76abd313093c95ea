//! The binding table: which key or button chord runs which function.
//!
//! A binding is written as two strings. The trigger side is a `+` (or `,`)
//! separated list of modifiers and exactly one key or button, e.g.
//! `mask1+altmask+Escape` or `mask2+button1`. The function side names a
//! function, any number of flags and at most one number, e.g.
//! `move,relative+left` or `vdesk,3`.

use crate::{
    error::Error,
    x::input::{
        button_from_name,
        keysym_from_name,
        keysym_name,
        Keysym,
        ModMask,
        KEY_STATE_MASK,
        LOCK_MASK,
    },
};
use bitflags::bitflags;
use std::{fmt, mem};

/// Keysym of `Multi_key`, the fallback for toggling bindings back on
const XK_MULTI_KEY: Keysym = 0xff20;

// ============================== BindFlags =============================== [[[

bitflags! {
    /// Flags carried by a binding. The low byte holds a small number, such as
    /// the desktop of `vdesk,3`.
    #[derive(Default)]
    pub(crate) struct BindFlags: u32 {
        const VALUE    = 0x0000_00ff;
        /// The function acts on a client
        const CLIENT   = 1 << 8;
        /// The function acts on a screen
        const SCREEN   = 1 << 9;
        const UP       = 1 << 10;
        const DOWN     = 1 << 11;
        const LEFT     = 1 << 12;
        const RIGHT    = 1 << 13;
        const TOP      = 1 << 14;
        const BOTTOM   = 1 << 15;
        const RELATIVE = 1 << 16;
        const TOGGLE   = 1 << 17;
        const VERT     = 1 << 18;
        const HORZ     = 1 << 19;
    }
}

impl BindFlags {
    /// The number embedded in the low byte
    pub(crate) const fn value(self) -> u32 {
        self.bits & Self::VALUE.bits
    }

    /// Replace the embedded number
    pub(crate) fn set_value(&mut self, value: u32) {
        *self = Self::from_bits_truncate((self.bits & !Self::VALUE.bits) | (value & Self::VALUE.bits));
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "up" | "u" | "on" => Self::UP,
            "down" | "d" | "off" => Self::DOWN,
            "left" | "l" => Self::LEFT,
            "right" | "r" => Self::RIGHT,
            "top" => Self::TOP,
            "bottom" => Self::BOTTOM,
            "relative" | "rel" => Self::RELATIVE,
            "toggle" => Self::TOGGLE,
            "vertical" | "v" => Self::VERT,
            "horizontal" | "h" => Self::HORZ,
            _ => return None,
        })
    }
}

// ]]] === BindFlags ===

// ============================== Function ================================ [[[

/// Functions a binding can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Function {
    /// Close a client; a value of 1 kills it instead
    Delete,
    Dock,
    Docks,
    Info,
    Lower,
    Move,
    Next,
    Raise,
    Resize,
    Spawn,
    Vdesk,
    Fix,
    Binds,
}

/// Function names and the flags they start out with
const FUNCTIONS: &[(&str, Function, BindFlags)] = &[
    ("delete", Function::Delete, BindFlags::CLIENT),
    ("kill", Function::Delete, BindFlags::from_bits_truncate(BindFlags::CLIENT.bits | 1)),
    ("dock", Function::Dock, BindFlags::CLIENT),
    ("docks", Function::Docks, BindFlags::SCREEN),
    ("info", Function::Info, BindFlags::CLIENT),
    ("lower", Function::Lower, BindFlags::CLIENT),
    ("move", Function::Move, BindFlags::CLIENT),
    ("next", Function::Next, BindFlags::empty()),
    ("raise", Function::Raise, BindFlags::CLIENT),
    ("resize", Function::Resize, BindFlags::CLIENT),
    ("spawn", Function::Spawn, BindFlags::empty()),
    ("vdesk", Function::Vdesk, BindFlags::SCREEN),
    ("fix", Function::Fix, BindFlags::CLIENT),
    ("binds", Function::Binds, BindFlags::SCREEN),
];

impl Function {
    fn lookup(name: &str) -> Option<(Self, BindFlags)> {
        FUNCTIONS
            .iter()
            .find(|(n, ..)| *n == name)
            .map(|&(_, f, flags)| (f, flags))
    }

    pub(crate) fn name(self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, f, _)| *f == self)
            .map_or("?", |(n, ..)| n)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ]]] === Function ===

// ============================ ModifierGroups ============================ [[[

/// The three user-definable modifier groups that bindings refer to by name
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ModifierGroups {
    /// Most keyboard bindings
    pub(crate) mask1:   u16,
    /// Button bindings and focus cycling
    pub(crate) mask2:   u16,
    /// Alternative behaviour, e.g. killing instead of closing
    pub(crate) altmask: u16,
}

impl ModifierGroups {
    /// Resolve a modifier name, including the group names
    pub(crate) fn lookup(&self, name: &str) -> Option<u16> {
        match name {
            "mask1" => Some(self.mask1),
            "mask2" => Some(self.mask2),
            "altmask" => Some(self.altmask),
            _ => ModMask::from_name(name).map(u16::from),
        }
    }

    /// Set a group from a string such as `control+alt`. Unrecognised tokens
    /// contribute nothing.
    pub(crate) fn set(&mut self, group: &str, spec: &str) -> Result<(), Error> {
        let value = tokens(spec)
            .filter_map(|tok| self.lookup(tok))
            .fold(0, |acc, m| acc | m);

        match group {
            "mask1" => self.mask1 = value,
            "mask2" => self.mask2 = value,
            "altmask" => self.altmask = value,
            other => return Err(Error::UnknownModifier(other.to_string())),
        }

        log::debug!("modifier group {} set to {:#06x}", group, value);
        Ok(())
    }
}

// ]]] === ModifierGroups ===

// ================================= Bind ================================= [[[

/// What sets a binding off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Trigger {
    Key(Keysym),
    Button(u8),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Key(sym) => write!(f, "{}", keysym_name(*sym)),
            Self::Button(b) => write!(f, "button{}", b),
        }
    }
}

/// A single binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bind {
    pub(crate) trigger:  Trigger,
    /// Modifiers that must be held
    pub(crate) state:    u16,
    pub(crate) function: Function,
    pub(crate) flags:    BindFlags,
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mods = ModMask::describe(self.state);
        if mods.is_empty() {
            write!(f, "{}={}", self.trigger, self.function)
        } else {
            write!(f, "{}+{}={}", mods, self.trigger, self.function)
        }
    }
}

// ]]] === Bind ===

/// Built-in bindings, applied before the user's
pub(crate) const DEFAULT_BINDS: &[(&str, &str)] = &[
    ("mask2+button1", "move"),
    ("mask2+button2", "resize"),
    ("mask2+button3", "lower"),
    ("mask2+Tab", "next"),
    ("mask1+Return", "spawn"),
    ("mask1+Escape", "delete"),
    ("mask1+altmask+Escape", "kill"),
    ("mask1+i", "info"),
    ("mask1+Insert", "lower"),
    ("mask1+KP_Insert", "lower"),
    ("mask1+f", "fix,toggle"),
    ("mask1+y", "move,top+left"),
    ("mask1+u", "move,top+right"),
    ("mask1+h", "move,relative+left"),
    ("mask1+j", "move,relative+down"),
    ("mask1+k", "move,relative+up"),
    ("mask1+l", "move,relative+right"),
    ("mask1+b", "move,bottom+left"),
    ("mask1+n", "move,bottom+right"),
    ("mask1+altmask+h", "resize,relative+left"),
    ("mask1+altmask+j", "resize,relative+down"),
    ("mask1+altmask+k", "resize,relative+up"),
    ("mask1+altmask+l", "resize,relative+right"),
    ("mask1+x", "resize,toggle+v+h"),
    ("mask1+equal", "resize,toggle+v"),
    ("mask1+altmask+equal", "resize,toggle+h"),
    ("mask1+d", "docks,toggle"),
    ("mask1+Multi_key", "binds,toggle"),
    ("mask1+1", "vdesk,0"),
    ("mask1+2", "vdesk,1"),
    ("mask1+3", "vdesk,2"),
    ("mask1+4", "vdesk,3"),
    ("mask1+5", "vdesk,4"),
    ("mask1+6", "vdesk,5"),
    ("mask1+7", "vdesk,6"),
    ("mask1+8", "vdesk,7"),
    ("mask1+a", "vdesk,toggle"),
    ("mask1+Left", "vdesk,relative+down"),
    ("mask1+Right", "vdesk,relative+up"),
    ("mask1+Down", "vdesk,relative+left"),
    ("mask1+Up", "vdesk,relative+right"),
];

/// Split a binding string on `+` and `,`, dropping empty pieces
fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c == '+' || c == ',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Parse an integer written in decimal, `0x` hexadecimal or `0` octal
fn parse_number(s: &str) -> Option<i64> {
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };

    Some(if neg { -value } else { value })
}

/// Every grab variant of a modifier state, so that bindings still work with
/// caps-lock or num-lock on
pub(crate) fn lock_variants(state: u16, numlock: u16) -> Vec<u16> {
    let mut variants = vec![state, state | LOCK_MASK];
    if numlock != 0 {
        variants.push(state | numlock);
        variants.push(state | numlock | LOCK_MASK);
    }
    variants
}

// =============================== BindTable ============================== [[[

/// The active bindings, most recently added first
#[derive(Debug, Clone, Default)]
pub(crate) struct BindTable {
    binds:             Vec<Bind>,
    /// Bindings set aside while input is being passed through
    stash:             Option<Vec<Bind>>,
    pub(crate) groups: ModifierGroups,
}

impl BindTable {
    /// Create a new [`BindTable`] using the given modifier groups
    pub(crate) fn new(groups: ModifierGroups) -> Self {
        Self {
            binds: vec![],
            stash: None,
            groups,
        }
    }

    pub(crate) fn binds(&self) -> &[Bind] {
        &self.binds
    }

    pub(crate) const fn is_stashed(&self) -> bool {
        self.stash.is_some()
    }

    /// Parse the trigger side of a binding into a trigger and modifier state
    fn parse_trigger(&self, ctl: &str) -> Result<(Trigger, u16), Error> {
        let mut state = 0;
        let mut trigger = None;

        for tok in tokens(ctl) {
            if let Some(m) = self.groups.lookup(tok) {
                state |= m;
                continue;
            }

            if trigger.is_some() {
                log::warn!("ignoring '{}' in binding '{}': only one key or button is used", tok, ctl);
                continue;
            }

            if let Some(b) = button_from_name(tok) {
                trigger = Some(Trigger::Button(b));
            } else if let Some(sym) = keysym_from_name(tok) {
                trigger = Some(Trigger::Key(sym));
            } else {
                return Err(Error::UnknownKey {
                    token:   tok.to_string(),
                    binding: ctl.to_string(),
                });
            }
        }

        let trigger = trigger.ok_or_else(|| Error::NoTrigger(ctl.to_string()))?;
        // Caps lock never takes part in matching
        state &= !LOCK_MASK;
        if matches!(trigger, Trigger::Button(_)) && state == 0 {
            state = self.groups.mask2;
        }

        Ok((trigger, state))
    }

    /// Parse the function side of a binding
    fn parse_function(ctl: &str, func: &str) -> Result<(Function, BindFlags), Error> {
        let mut function = None;
        let mut flags = BindFlags::empty();

        for tok in tokens(func) {
            if let Some((f, initial)) = Function::lookup(tok) {
                function = Some(f);
                flags = initial;
            } else if let Some(n) = parse_number(tok) {
                flags.set_value(n as u32);
            } else if let Some(flag) = BindFlags::from_name(tok) {
                flags |= flag;
            } else {
                return Err(Error::UnknownFlag {
                    flag:    tok.to_string(),
                    binding: format!("{}={}", ctl, func),
                });
            }
        }

        let function = function.ok_or_else(|| Error::UnknownFunction(format!("{}={}", ctl, func)))?;
        if flags.contains(BindFlags::CLIENT | BindFlags::SCREEN) {
            return Err(Error::ConflictingScope(format!("{}={}", ctl, func)));
        }

        Ok((function, flags))
    }

    /// Bind `ctl` to `func`. Any existing binding of the same chord is
    /// removed first, and an empty `func` leaves the chord unbound.
    pub(crate) fn apply(&mut self, ctl: &str, func: &str) -> Result<(), Error> {
        let (trigger, state) = self.parse_trigger(ctl)?;

        let before = self.binds.len();
        self.binds
            .retain(|b| !(b.trigger == trigger && b.state == state));
        if self.binds.len() != before {
            log::debug!("replaced existing binding for {}", ctl);
        }

        if func.trim().is_empty() {
            log::debug!("unbound {}", ctl);
            return Ok(());
        }

        let (function, flags) = Self::parse_function(ctl, func)?;
        self.binds.insert(0, Bind {
            trigger,
            state,
            function,
            flags,
        });

        Ok(())
    }

    /// First binding matching a trigger. Lock bits are ignored on both
    /// sides, as is num-lock.
    pub(crate) fn lookup(&self, trigger: Trigger, state: u16, numlock: u16) -> Option<&Bind> {
        let held = state & KEY_STATE_MASK & !numlock;
        self.binds
            .iter()
            .find(|b| b.trigger == trigger && (b.state & KEY_STATE_MASK & !numlock) == held)
    }

    /// Like [`lookup`](Self::lookup), but a button press that matches
    /// nothing is tried once more with `mask2` toggled
    pub(crate) fn resolve(&self, trigger: Trigger, state: u16, numlock: u16) -> Option<&Bind> {
        self.lookup(trigger, state, numlock).or_else(|| match trigger {
            Trigger::Button(_) => self.lookup(trigger, state ^ self.groups.mask2, numlock),
            Trigger::Key(_) => None,
        })
    }

    /// Set the bindings aside, keeping only those that bring them back.
    ///
    /// Returns the button bindings, which the caller must ungrab from every
    /// client and then hand back through [`restore_buttons`](Self::restore_buttons)
    /// once the screen has been regrabbed. Returns `None` if already stashed.
    pub(crate) fn stash(&mut self) -> Option<Vec<Bind>> {
        if self.stash.is_some() {
            return None;
        }

        let all = mem::take(&mut self.binds);
        let mut buttons = vec![];

        for b in &all {
            if b.function == Function::Binds && b.flags.intersects(BindFlags::TOGGLE | BindFlags::UP) {
                self.binds.push(*b);
            } else if matches!(b.trigger, Trigger::Button(_)) {
                buttons.push(*b);
            }
        }

        if self.binds.is_empty() {
            log::warn!("no binding restores the others; binding mask1+altmask+Multi_key=binds,up");
            self.binds.push(Bind {
                trigger:  Trigger::Key(XK_MULTI_KEY),
                state:    self.groups.mask1 | self.groups.altmask,
                function: Function::Binds,
                flags:    BindFlags::SCREEN | BindFlags::UP,
            });
        }

        self.stash = Some(all);
        Some(buttons)
    }

    /// Append the stashed button bindings after the screen was regrabbed
    pub(crate) fn restore_buttons(&mut self, buttons: Vec<Bind>) {
        self.binds.extend(buttons);
    }

    /// Bring the stashed bindings back. Returns `false` if nothing was stashed.
    pub(crate) fn unstash(&mut self) -> bool {
        match self.stash.take() {
            Some(all) => {
                self.binds = all;
                true
            },
            None => false,
        }
    }
}

// ]]] === BindTable ===

#[cfg(test)]
mod tests {
    use super::*;

    const ALT: u16 = 0x08;
    const CTRL: u16 = 0x04;
    const SHIFT: u16 = 0x01;
    const NUMLOCK: u16 = 0x10;

    fn table() -> BindTable {
        let mut groups = ModifierGroups::default();
        groups.set("mask1", "control+alt").unwrap();
        groups.set("mask2", "alt").unwrap();
        groups.set("altmask", "shift").unwrap();
        BindTable::new(groups)
    }

    #[test]
    fn modifier_groups() {
        let t = table();
        assert_eq!(t.groups.mask1, CTRL | ALT);
        assert_eq!(t.groups.mask2, ALT);
        assert_eq!(t.groups.altmask, SHIFT);

        let mut g = t.groups;
        // Unknown tokens are skipped, groups may refer to other groups
        g.set("mask1", "mask2+bogus+mod4").unwrap();
        assert_eq!(g.mask1, ALT | 0x40);
        assert!(g.set("mask9", "alt").is_err());
    }

    #[test]
    fn rebinding_replaces() {
        let mut t = table();
        t.apply("F1+alt", "raise").unwrap();
        t.apply("alt+F1", "lower").unwrap();

        let matching: Vec<_> = t
            .binds()
            .iter()
            .filter(|b| b.trigger == Trigger::Key(0xffbe) && b.state == ALT)
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].function, Function::Lower);

        // Empty function unbinds
        t.apply("alt+F1", "").unwrap();
        assert!(t.binds().is_empty());
    }

    #[test]
    fn parse_function_side() {
        let mut t = table();
        t.apply("mask1+3", "vdesk,2").unwrap();
        t.apply("mask1+altmask+Escape", "kill").unwrap();
        t.apply("mask1+x", "resize,toggle+v+h").unwrap();

        let vdesk = t.lookup(Trigger::Key(0x33), CTRL | ALT, 0).unwrap();
        assert_eq!(vdesk.function, Function::Vdesk);
        assert_eq!(vdesk.flags.value(), 2);
        assert!(vdesk.flags.contains(BindFlags::SCREEN));

        let kill = t.lookup(Trigger::Key(0xff1b), CTRL | ALT | SHIFT, 0).unwrap();
        assert_eq!(kill.function, Function::Delete);
        assert_eq!(kill.flags.value(), 1);

        let resize = t.lookup(Trigger::Key(0x78), CTRL | ALT, 0).unwrap();
        assert!(resize.flags.contains(BindFlags::TOGGLE | BindFlags::VERT | BindFlags::HORZ | BindFlags::CLIENT));
    }

    #[test]
    fn malformed_bindings_are_dropped() {
        let mut t = table();
        assert!(matches!(t.apply("mask1+Bogus_Key", "raise"), Err(Error::UnknownKey { .. })));
        assert!(matches!(t.apply("mask1", "raise"), Err(Error::NoTrigger(_))));
        assert!(matches!(t.apply("mask1+r", "frobnicate"), Err(Error::UnknownFlag { .. })));
        assert!(matches!(t.apply("mask1+r", "up"), Err(Error::UnknownFunction(_))));
        assert!(t.binds().is_empty());

        // Only the first trigger counts
        t.apply("mask1+r+s", "raise").unwrap();
        assert_eq!(t.binds()[0].trigger, Trigger::Key(0x72));
    }

    #[test]
    fn buttons_default_to_mask2() {
        let mut t = table();
        t.apply("button3", "lower").unwrap();
        assert_eq!(t.binds()[0].state, ALT);
        assert_eq!(t.binds()[0].trigger, Trigger::Button(3));
    }

    #[test]
    fn dispatch_normalizes_modifiers() {
        let mut t = table();
        t.apply("mask1+Return", "spawn").unwrap();

        let ret = Trigger::Key(0xff0d);
        assert!(t.lookup(ret, CTRL | ALT, NUMLOCK).is_some());
        assert!(t.lookup(ret, CTRL | ALT | NUMLOCK, NUMLOCK).is_some());
        assert!(t.lookup(ret, CTRL | ALT | LOCK_MASK, NUMLOCK).is_some());
        // Button state bits above the modifiers are ignored too
        assert!(t.lookup(ret, CTRL | ALT | 0x100, 0).is_some());
        assert!(t.lookup(ret, CTRL, NUMLOCK).is_none());
        assert!(t.lookup(ret, CTRL | ALT | SHIFT, NUMLOCK).is_none());
    }

    #[test]
    fn lock_in_a_binding_is_ignored() {
        let mut t = table();
        t.apply("lock+mask1+Return", "spawn").unwrap();

        let ret = Trigger::Key(0xff0d);
        assert!(t.lookup(ret, CTRL | ALT, NUMLOCK).is_some());
        assert!(t.lookup(ret, CTRL | ALT | LOCK_MASK, NUMLOCK).is_some());

        // The same chord written without lock replaces it
        t.apply("mask1+Return", "lower").unwrap();
        assert_eq!(t.binds.iter().filter(|b| b.trigger == ret).count(), 1);
        assert_eq!(t.lookup(ret, CTRL | ALT, 0).map(|b| b.function), Some(Function::Lower));

        // A button bound with only lock still gets mask2
        t.apply("lock+button1", "move").unwrap();
        assert!(t.lookup(Trigger::Button(1), ALT, 0).is_some());
    }

    #[test]
    fn button_dispatch_retries_with_mask2() {
        let mut t = table();
        t.apply("mask2+button1", "move").unwrap();

        // Pressed without alt: only found on the retry
        assert!(t.lookup(Trigger::Button(1), 0, 0).is_none());
        assert_eq!(t.resolve(Trigger::Button(1), 0, 0).map(|b| b.function), Some(Function::Move));

        t.apply("mask1+m", "move").unwrap();
        assert!(t.resolve(Trigger::Key(0x6d), CTRL, 0).is_none());
    }

    fn apply_defaults(t: &mut BindTable) {
        for (ctl, func) in DEFAULT_BINDS {
            t.apply(ctl, func).unwrap();
        }
    }

    #[test]
    fn defaults_all_parse() {
        let mut t = table();
        apply_defaults(&mut t);
        assert_eq!(t.binds().len(), DEFAULT_BINDS.len());
    }

    #[test]
    fn stash_and_unstash() {
        let mut t = table();
        apply_defaults(&mut t);
        let total = t.binds().len();

        let buttons = t.stash().unwrap();
        assert_eq!(buttons.len(), 3);
        assert!(t.is_stashed());
        assert!(t.stash().is_none());

        // Only the toggle survives
        assert_eq!(t.binds().len(), 1);
        assert_eq!(t.binds()[0].function, Function::Binds);
        t.restore_buttons(buttons);
        assert_eq!(t.binds().len(), 4);

        assert!(t.unstash());
        assert!(!t.unstash());
        assert_eq!(t.binds().len(), total);
    }

    #[test]
    fn stash_falls_back_to_multi_key() {
        let mut t = table();
        t.apply("mask1+r", "raise").unwrap();
        t.stash().unwrap();

        let b = t.binds()[0];
        assert_eq!(b.trigger, Trigger::Key(XK_MULTI_KEY));
        assert_eq!(b.state, CTRL | ALT | SHIFT);
        assert!(b.flags.contains(BindFlags::UP | BindFlags::SCREEN));
    }

    #[test]
    fn numbers_and_variants() {
        assert_eq!(parse_number("0"), Some(0));
        assert_eq!(parse_number("12"), Some(12));
        assert_eq!(parse_number("0x1f"), Some(31));
        assert_eq!(parse_number("010"), Some(8));
        assert_eq!(parse_number("-1"), Some(-1));
        assert_eq!(parse_number("v"), None);

        assert_eq!(lock_variants(ALT, 0), vec![ALT, ALT | LOCK_MASK]);
        assert_eq!(lock_variants(ALT, NUMLOCK).len(), 4);
    }
}
