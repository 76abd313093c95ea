//! Properties on the server: ICCCM, EWMH and Motif hints, in the shape the
//! window manager uses them

use crate::geometry::{Gravity, SizeConstraints};
use bitflags::bitflags;

// ============================ SizeHints =============================

bitflags! {
    /// The flags used inside WmSizeHints.
    #[derive(Default)]
    pub(crate) struct WmSizeHintsFlags: u32 {
        /// User-specified x and y
        const US_POSITION   = 0b00_0000_0001;
        /// User-specified window size
        const US_SIZE       = 0b00_0000_0010;
        /// Program-specified position
        const P_POSITION    = 0b00_0000_0100;
        /// Program-specified size
        const P_SIZE        = 0b00_0000_1000;
        /// Program-specified minimum size
        const P_MIN_SIZE    = 0b00_0001_0000;
        /// Program specified maximum size
        const P_MAX_SIZE    = 0b00_0010_0000;
        /// Program specified resize increments
        const P_RESIZE_INC  = 0b00_0100_0000;
        /// Program specified aspect ratios
        const P_ASPECT      = 0b00_1000_0000;
        /// Program specified base size
        const P_BASE_SIZE   = 0b01_0000_0000;
        /// Program specified window gravity
        const P_WIN_GRAVITY = 0b10_0000_0000;
    }
}

/// The length of the data for WM_SIZE_HINTS.
pub(crate) const WM_SIZE_HINTS_LEN: usize = 18;

/// Structure representing a `WM_SIZE_HINTS` property
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct WmSizeHints {
    pub(crate) flags:          WmSizeHintsFlags,
    /// The minimum size that the window may be assigned
    pub(crate) min_size:       (i32, i32),
    /// The maximum size that the window may be assigned
    pub(crate) max_size:       (i32, i32),
    /// The increment to be used for sizing the window together with
    /// `base_size`
    pub(crate) size_increment: (i32, i32),
    /// The base size of the window
    pub(crate) base_size:      (i32, i32),
    /// The gravity that is used to make room for window decorations
    pub(crate) gravity:        u32,
}

impl WmSizeHints {
    /// Decode the 32-bit items of a `WM_SIZE_HINTS` property. Properties
    /// written by pre-ICCCM clients lack the last three fields.
    pub(crate) fn from_raw(data: &[u32]) -> Option<Self> {
        if data.len() < 15 {
            return None;
        }
        let item = |i: usize| data.get(i).map_or(0, |&v| v as i32);

        Some(Self {
            flags:          WmSizeHintsFlags::from_bits_truncate(data[0]),
            min_size:       (item(5), item(6)),
            max_size:       (item(7), item(8)),
            size_increment: (item(9), item(10)),
            base_size:      (item(15), item(16)),
            gravity:        data.get(17).copied().unwrap_or(1),
        })
    }

    /// Whether the user chose the window's position
    pub(crate) const fn user_position(&self) -> bool {
        self.flags.contains(WmSizeHintsFlags::US_POSITION)
    }

    /// Derive size constraints and gravity. Missing hints fall back as
    /// ICCCM suggests: base defaults to min, and min to base plus one
    /// increment.
    pub(crate) fn constraints(&self) -> (SizeConstraints, Gravity) {
        let has = |f| self.flags.contains(f);

        let (mut min_w, mut min_h) = if has(WmSizeHintsFlags::P_MIN_SIZE) {
            self.min_size
        } else {
            (0, 0)
        };
        let (max_w, max_h) = if has(WmSizeHintsFlags::P_MAX_SIZE) {
            self.max_size
        } else {
            (0, 0)
        };
        let (base_w, base_h) = if has(WmSizeHintsFlags::P_BASE_SIZE) {
            self.base_size
        } else {
            (min_w, min_h)
        };
        let (inc_w, inc_h) = if has(WmSizeHintsFlags::P_RESIZE_INC) {
            (self.size_increment.0.max(1), self.size_increment.1.max(1))
        } else {
            (1, 1)
        };

        if !has(WmSizeHintsFlags::P_MIN_SIZE) {
            min_w = base_w + inc_w;
            min_h = base_h + inc_h;
        }

        let gravity = if has(WmSizeHintsFlags::P_WIN_GRAVITY) {
            Gravity::from(self.gravity)
        } else {
            Gravity::NorthWest
        };

        (
            SizeConstraints {
                min_width:   min_w,
                min_height:  min_h,
                max_width:   max_w.max(0),
                max_height:  max_h.max(0),
                base_width:  base_w,
                base_height: base_h,
                width_inc:   inc_w,
                height_inc:  inc_h,
            },
            gravity,
        )
    }
}

/// Constraints for a window without any `WM_NORMAL_HINTS`
pub(crate) fn default_constraints() -> (SizeConstraints, Gravity) {
    WmSizeHints::default().constraints()
}

// ============================ MotifHints ============================

/// Number of items in `_MOTIF_WM_HINTS` that are read
pub(crate) const MOTIF_HINTS_LEN: usize = 3;

const MWM_HINTS_DECORATIONS: u32 = 1 << 1;
const MWM_DECOR_ALL: u32 = 1 << 0;
const MWM_DECOR_BORDER: u32 = 1 << 1;

/// The part of `_MOTIF_WM_HINTS` that says whether to draw a border
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct MotifHints {
    pub(crate) flags:       u32,
    pub(crate) decorations: u32,
}

impl MotifHints {
    pub(crate) fn from_raw(data: &[u32]) -> Option<Self> {
        (data.len() >= MOTIF_HINTS_LEN).then(|| Self {
            flags:       data[0],
            decorations: data[2],
        })
    }

    /// Whether the window asked for no border at all
    pub(crate) const fn disables_border(&self) -> bool {
        self.flags & MWM_HINTS_DECORATIONS != 0
            && self.decorations & (MWM_DECOR_ALL | MWM_DECOR_BORDER) == 0
    }
}

// ============================ WindowType ============================

bitflags! {
    /// The `_NET_WM_WINDOW_TYPE`s the window manager treats specially
    #[derive(Default)]
    pub(crate) struct WindowType: u8 {
        /// Mapped but never managed
        const DESKTOP      = 0b001;
        /// Sets the dock flag
        const DOCK         = 0b010;
        /// Not focused when mapped
        const NOTIFICATION = 0b100;
    }
}

// ======================= Icccm Window State ======================

/// Possible values for setting the `WM_STATE` property on a client.
///
/// See the [ICCCM docs][1] for more information.
///
/// [1]: https://tronche.com/gui/x/icccm/sec-4.html#s-4.1.3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum IcccmWindowState {
    /// Being removed
    Withdrawn,
    /// Window is visible
    Normal,
    /// Window is hidden on another desktop
    Iconic,
}

impl From<IcccmWindowState> for u32 {
    fn from(u: IcccmWindowState) -> Self {
        match u {
            IcccmWindowState::Withdrawn => 0,
            IcccmWindowState::Normal => 1,
            IcccmWindowState::Iconic => 3,
        }
    }
}

// ============================= NetWmState ============================

/// The `_NET_WM_STATE` atoms the window manager publishes and understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NetWmState {
    MaximizedVert,
    MaximizedHorz,
    Fullscreen,
    Hidden,
    Focused,
}

/// The `_NET_WM_ALLOWED_ACTIONS` the window manager grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AllowedAction {
    Move,
    Resize,
    MaximizeHorz,
    MaximizeVert,
    Fullscreen,
    ChangeDesktop,
    Close,
}

/// Axis of a pre-maximise geometry stored on a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Axis {
    /// Stored as `_EVWM_UNMAXIMISED_HORZ`
    Horizontal,
    /// Stored as `_EVWM_UNMAXIMISED_VERT`
    Vertical,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(flags: WmSizeHintsFlags, f: impl FnOnce(&mut [u32; WM_SIZE_HINTS_LEN])) -> WmSizeHints {
        let mut data = [0_u32; WM_SIZE_HINTS_LEN];
        data[0] = flags.bits();
        f(&mut data);
        WmSizeHints::from_raw(&data).unwrap()
    }

    #[test]
    fn no_hints() {
        let (c, g) = default_constraints();
        assert_eq!((c.min_width, c.min_height), (1, 1));
        assert_eq!((c.base_width, c.width_inc), (0, 1));
        assert_eq!((c.max_width, c.max_height), (0, 0));
        assert_eq!(g, Gravity::NorthWest);
    }

    #[test]
    fn terminal_like_hints() {
        let hints = raw(
            WmSizeHintsFlags::P_BASE_SIZE | WmSizeHintsFlags::P_RESIZE_INC | WmSizeHintsFlags::P_WIN_GRAVITY,
            |d| {
                d[9] = 7;
                d[10] = 14;
                d[15] = 4;
                d[16] = 2;
                d[17] = 9;
            },
        );
        let (c, g) = hints.constraints();
        assert_eq!((c.base_width, c.base_height), (4, 2));
        assert_eq!((c.width_inc, c.height_inc), (7, 14));
        // No minimum: one increment over the base
        assert_eq!((c.min_width, c.min_height), (11, 16));
        assert_eq!(g, Gravity::SouthEast);
    }

    #[test]
    fn base_defaults_to_min_and_zero_increment() {
        let hints = raw(WmSizeHintsFlags::P_MIN_SIZE | WmSizeHintsFlags::P_RESIZE_INC, |d| {
            d[5] = 100;
            d[6] = 50;
            d[9] = 0;
            d[10] = 3;
        });
        let (c, _) = hints.constraints();
        assert_eq!((c.base_width, c.base_height), (100, 50));
        assert_eq!((c.width_inc, c.height_inc), (1, 3));
        assert_eq!((c.min_width, c.min_height), (100, 50));
    }

    #[test]
    fn short_properties() {
        assert!(WmSizeHints::from_raw(&[0; 4]).is_none());
        let old = WmSizeHints::from_raw(&[WmSizeHintsFlags::US_POSITION.bits(); 15]).unwrap();
        assert!(old.user_position());
        assert_eq!(old.base_size, (0, 0));
    }

    #[test]
    fn motif_border() {
        assert!(MotifHints::from_raw(&[2, 0, 0]).unwrap().disables_border());
        assert!(!MotifHints::from_raw(&[2, 0, 1]).unwrap().disables_border());
        assert!(!MotifHints::from_raw(&[0, 0, 0]).unwrap().disables_border());
        assert!(MotifHints::from_raw(&[2]).is_none());
    }
}
