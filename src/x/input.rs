//! Keyboard and pointer input: modifier masks, buttons and keysym names

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};
use x11rb::protocol::xproto::{Button as XButton, ModMask as XModMask};

/// A keysym as defined by the core protocol
pub(crate) type Keysym = u32;

// ============================== ModMask =============================
// ====================================================================

/// Keycode modifier that is held
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ModMask {
    /// Left or right `shift` key
    Shift,
    /// Caps-lock
    Lock,
    /// Left or right `control` key
    #[serde(alias = "ctrl")]
    Control,
    /// Modifier 1 as defined in `xmodmap` (usually `alt`)
    #[serde(alias = "alt")]
    Mod1,
    /// Modifier 2 as defined in `xmodmap` (usually `num-lock`)
    Mod2,
    /// Modifier 3 as defined in `xmodmap` (usually blank)
    Mod3,
    /// Modifier 4 as defined in `xmodmap` (usually `super`)
    Mod4,
    /// Modifier 5 as defined or in `xmodmap` (usually `mode_shift`)
    Mod5,
}

impl ModMask {
    /// Look a modifier up by any of the names it is written as in a binding
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "shift" => Some(Self::Shift),
            "lock" => Some(Self::Lock),
            "control" | "ctrl" => Some(Self::Control),
            "mod1" | "alt" => Some(Self::Mod1),
            "mod2" => Some(Self::Mod2),
            "mod3" => Some(Self::Mod3),
            "mod4" => Some(Self::Mod4),
            "mod5" => Some(Self::Mod5),
            _ => None,
        }
    }

    pub(crate) fn was_held(self, mask: u16) -> bool {
        mask & u16::from(self) > 0
    }

    /// Names of all modifiers held in `mask`, joined the way bindings are
    /// written
    pub(crate) fn describe(mask: u16) -> String {
        Self::iter()
            .filter(|m| m.was_held(mask))
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Convert from a [`ModMask`] to an [`x11rb`] [`ModMask`](XModMask)
impl From<ModMask> for XModMask {
    fn from(m: ModMask) -> Self {
        match m {
            ModMask::Shift => Self::SHIFT,
            ModMask::Lock => Self::LOCK,
            ModMask::Control => Self::CONTROL,
            ModMask::Mod1 => Self::M1,
            ModMask::Mod2 => Self::M2,
            ModMask::Mod3 => Self::M3,
            ModMask::Mod4 => Self::M4,
            ModMask::Mod5 => Self::M5,
        }
    }
}

impl From<ModMask> for u16 {
    fn from(m: ModMask) -> Self {
        u16::from(XModMask::from(m))
    }
}

impl fmt::Display for ModMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Shift => "shift",
            Self::Lock => "lock",
            Self::Control => "control",
            Self::Mod1 => "mod1",
            Self::Mod2 => "mod2",
            Self::Mod3 => "mod3",
            Self::Mod4 => "mod4",
            Self::Mod5 => "mod5",
        };
        write!(f, "{}", name)
    }
}

/// Modifiers that take part in matching a binding. `Lock` is never
/// considered.
pub(crate) const KEY_STATE_MASK: u16 = 0x0001 | 0x0004 | 0x0008 | 0x0010 | 0x0020 | 0x0040 | 0x0080;

/// The `Lock` modifier bit
pub(crate) const LOCK_MASK: u16 = 0x0002;

// ============================== Button ==============================
// ====================================================================

/// Available buttons on a mouse
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Button {
    /// 1, Left-click
    #[serde(rename = "button1")]
    Left,
    /// 2, Middle-click
    #[serde(rename = "button2")]
    Middle,
    /// 3, Right-click
    #[serde(rename = "button3")]
    Right,
    /// 4, Wheel-scroll up
    #[serde(rename = "button4")]
    ScrollUp,
    /// 5, Wheel-scroll down
    #[serde(rename = "button5")]
    ScrollDown,
}

impl From<Button> for XButton {
    fn from(b: Button) -> Self {
        match b {
            Button::Left => 1,
            Button::Middle => 2,
            Button::Right => 3,
            Button::ScrollUp => 4,
            Button::ScrollDown => 5,
        }
    }
}

impl TryFrom<u8> for Button {
    type Error = anyhow::Error;

    fn try_from(u: u8) -> Result<Self> {
        match u {
            1 => Ok(Self::Left),
            2 => Ok(Self::Middle),
            3 => Ok(Self::Right),
            4 => Ok(Self::ScrollUp),
            5 => Ok(Self::ScrollDown),
            _ => Err(anyhow!("mouse button {} is unknown", u)),
        }
    }
}

/// Parse a `buttonN` token. Any number the protocol can carry is accepted;
/// zero is not a button.
pub(crate) fn button_from_name(name: &str) -> Option<u8> {
    let num = name.strip_prefix("button")?;
    let parsed = if let Some(hex) = num.strip_prefix("0x") {
        u8::from_str_radix(hex, 16).ok()
    } else {
        num.parse::<u8>().ok()
    };
    parsed.filter(|&b| b != 0)
}

// ============================== Keysyms =============================
// ====================================================================

/// Keysyms with names that are not the character they produce
#[rustfmt::skip]
const NAMED_KEYSYMS: &[(&str, Keysym)] = &[
    ("BackSpace", 0xff08), ("Tab", 0xff09), ("Linefeed", 0xff0a), ("Clear", 0xff0b),
    ("Return", 0xff0d), ("Pause", 0xff13), ("Scroll_Lock", 0xff14), ("Sys_Req", 0xff15),
    ("Escape", 0xff1b), ("Multi_key", 0xff20), ("Home", 0xff50), ("Left", 0xff51),
    ("Up", 0xff52), ("Right", 0xff53), ("Down", 0xff54), ("Prior", 0xff55),
    ("Page_Up", 0xff55), ("Next", 0xff56), ("Page_Down", 0xff56), ("End", 0xff57),
    ("Begin", 0xff58), ("Select", 0xff60), ("Print", 0xff61), ("Execute", 0xff62),
    ("Insert", 0xff63), ("Undo", 0xff65), ("Redo", 0xff66), ("Menu", 0xff67),
    ("Find", 0xff68), ("Cancel", 0xff69), ("Help", 0xff6a), ("Break", 0xff6b),
    ("Num_Lock", 0xff7f), ("KP_Space", 0xff80), ("KP_Tab", 0xff89), ("KP_Enter", 0xff8d),
    ("KP_Home", 0xff95), ("KP_Left", 0xff96), ("KP_Up", 0xff97), ("KP_Right", 0xff98),
    ("KP_Down", 0xff99), ("KP_Prior", 0xff9a), ("KP_Page_Up", 0xff9a), ("KP_Next", 0xff9b),
    ("KP_Page_Down", 0xff9b), ("KP_End", 0xff9c), ("KP_Begin", 0xff9d), ("KP_Insert", 0xff9e),
    ("KP_Delete", 0xff9f), ("KP_Equal", 0xffbd), ("KP_Multiply", 0xffaa), ("KP_Add", 0xffab),
    ("KP_Separator", 0xffac), ("KP_Subtract", 0xffad), ("KP_Decimal", 0xffae),
    ("KP_Divide", 0xffaf), ("KP_0", 0xffb0), ("KP_1", 0xffb1), ("KP_2", 0xffb2),
    ("KP_3", 0xffb3), ("KP_4", 0xffb4), ("KP_5", 0xffb5), ("KP_6", 0xffb6), ("KP_7", 0xffb7),
    ("KP_8", 0xffb8), ("KP_9", 0xffb9),
    ("Shift_L", 0xffe1), ("Shift_R", 0xffe2), ("Control_L", 0xffe3), ("Control_R", 0xffe4),
    ("Caps_Lock", 0xffe5), ("Shift_Lock", 0xffe6), ("Meta_L", 0xffe7), ("Meta_R", 0xffe8),
    ("Alt_L", 0xffe9), ("Alt_R", 0xffea), ("Super_L", 0xffeb), ("Super_R", 0xffec),
    ("Hyper_L", 0xffed), ("Hyper_R", 0xffee), ("Delete", 0xffff),
    ("space", 0x0020), ("exclam", 0x0021), ("quotedbl", 0x0022), ("numbersign", 0x0023),
    ("dollar", 0x0024), ("percent", 0x0025), ("ampersand", 0x0026), ("apostrophe", 0x0027),
    ("parenleft", 0x0028), ("parenright", 0x0029), ("asterisk", 0x002a), ("plus", 0x002b),
    ("comma", 0x002c), ("minus", 0x002d), ("period", 0x002e), ("slash", 0x002f),
    ("colon", 0x003a), ("semicolon", 0x003b), ("less", 0x003c), ("equal", 0x003d),
    ("greater", 0x003e), ("question", 0x003f), ("at", 0x0040), ("bracketleft", 0x005b),
    ("backslash", 0x005c), ("bracketright", 0x005d), ("asciicircum", 0x005e),
    ("underscore", 0x005f), ("grave", 0x0060), ("braceleft", 0x007b), ("bar", 0x007c),
    ("braceright", 0x007d), ("asciitilde", 0x007e),
    ("XF86AudioLowerVolume", 0x1008_ff11), ("XF86AudioMute", 0x1008_ff12),
    ("XF86AudioRaiseVolume", 0x1008_ff13), ("XF86AudioPlay", 0x1008_ff14),
    ("XF86AudioStop", 0x1008_ff15), ("XF86AudioPrev", 0x1008_ff16),
    ("XF86AudioNext", 0x1008_ff17),
];

/// Resolve a keysym name the way `XStringToKeysym` does for the names a
/// binding is likely to use: single Latin-1 characters, digits, `F1`-`F35`,
/// the table above, and `0x`-prefixed raw values
pub(crate) fn keysym_from_name(name: &str) -> Option<Keysym> {
    if let Some(&(_, sym)) = NAMED_KEYSYMS.iter().find(|(n, _)| *n == name) {
        return Some(sym);
    }

    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_graphic() {
            return Some(ch as Keysym);
        }
    }

    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=35).contains(&n) {
            return Some(0xffbe + n - 1);
        }
    }

    name.strip_prefix("0x")
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .filter(|&sym| sym != 0)
}

/// Best effort name for a keysym, used in log messages
pub(crate) fn keysym_name(sym: Keysym) -> String {
    if let Some(&(name, _)) = NAMED_KEYSYMS.iter().find(|(_, s)| *s == sym) {
        return name.to_string();
    }
    match sym {
        0x21..=0x7e => char::from(sym as u8).to_string(),
        0xffbe..=0xffe0 => format!("F{}", sym - 0xffbe + 1),
        _ => format!("{:#x}", sym),
    }
}
