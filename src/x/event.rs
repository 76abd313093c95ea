//! X11 Events
//!
//! Every event is decoded once, at the connection boundary, into one of the
//! tagged variants below. Nothing past [`XConn`](crate::x::XConn) looks at raw
//! protocol structures.

use crate::{
    geometry::Point,
    x::{property::NetWmState, Colormap, Window},
};

// ============================== XEvent ============================== [[[

/// Low-level wrapper around X-server events
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XEvent {
    /// A key combination was pressed
    KeyPress(KeyEvent),
    /// A key was released
    KeyRelease(KeyEvent),
    /// A mouse button was pressed
    ButtonPress(ButtonEvent),
    /// A mouse button was released
    ButtonRelease(ButtonEvent),
    /// The pointer moved while grabbed
    Motion(MotionEvent),
    /// Request for configuration from a client
    ConfigureRequest(ConfigureRequestData),
    /// Notification that a window has changed its configuration
    ConfigureNotify(Window),
    /// A client is requesting to be mapped
    MapRequest(Window),
    /// A window was unmapped
    UnmapNotify {
        /// The unmapped window
        window: Window,
        /// The window the event was reported on
        event:  Window,
    },
    /// A window was destroyed
    DestroyNotify(Window),
    /// The pointer has entered a window
    EnterNotify(Window),
    /// A window's colormap attribute changed
    ColormapNotify {
        window:   Window,
        colormap: Colormap,
        /// Whether the attribute changed, as opposed to the map being
        /// installed or uninstalled
        new:      bool,
    },
    /// A window property was changed
    PropertyNotify {
        window: Window,
        kind:   PropertyKind,
    },
    /// A client message was received
    ClientMessage {
        window:  Window,
        message: NetMessage,
    },
    /// The keyboard or pointer mapping changed
    MappingNotify {
        /// Whether the keyboard part of the mapping changed
        keyboard: bool,
    },
    /// A window's shape changed
    ShapeNotify(Window),
    /// Received a randr screen change notify event
    ScreenChange {
        root:   Window,
        width:  i32,
        height: i32,
    },
    /// The server reported an error for an earlier request
    Error(XError),
    /// Unknown event type, used as a catchall for events not tracked
    Unknown(u8),
}

impl XEvent {
    /// Whether this event keeps the initialising and removing guards alive.
    /// Events caused directly by managing or removing a window, and errors
    /// about it, arrive between the request and the next unrelated event.
    pub(crate) const fn preserves_guards(&self) -> bool {
        matches!(
            self,
            Self::UnmapNotify { .. }
                | Self::DestroyNotify(_)
                | Self::EnterNotify(_)
                | Self::ColormapNotify { .. }
                | Self::Error(_)
        )
    }
}

// ]]] === XEvent ===

// ============================== Input =============================== [[[

/// Data associated with a key press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyEvent {
    pub(crate) root:     Window,
    /// The window the event was reported relative to
    pub(crate) window:   Window,
    /// The child of `window` containing the pointer
    pub(crate) child:    Option<Window>,
    /// Pointer position relative to the root
    pub(crate) root_pos: Point,
    /// Modifier state before the event
    pub(crate) state:    u16,
    pub(crate) keycode:  u8,
    pub(crate) time:     u32,
}

/// Data associated with a button press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ButtonEvent {
    pub(crate) root:     Window,
    pub(crate) window:   Window,
    pub(crate) child:    Option<Window>,
    pub(crate) root_pos: Point,
    pub(crate) state:    u16,
    /// Button index (1 = left, 2 = middle, ...)
    pub(crate) button:   u8,
    pub(crate) time:     u32,
}

/// Pointer motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MotionEvent {
    pub(crate) root:     Window,
    pub(crate) root_pos: Point,
    pub(crate) state:    u16,
    pub(crate) time:     u32,
}

// ]]] === Input ===

// ========================= ConfigureRequest ========================= [[[

/// Stacking requested through a configure request or `_NET_RESTACK_WINDOW`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackMode {
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

impl StackMode {
    /// Convert the protocol's numeric detail
    pub(crate) const fn from_detail(detail: u32) -> Option<Self> {
        match detail {
            0 => Some(Self::Above),
            1 => Some(Self::Below),
            2 => Some(Self::TopIf),
            3 => Some(Self::BottomIf),
            4 => Some(Self::Opposite),
            _ => None,
        }
    }
}

/// Data associated with a configure request. Only the present fields were
/// part of the request's value mask.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConfigureRequestData {
    /// The window associated with the event
    pub(crate) window:     Window,
    /// X coordinate to configure to
    pub(crate) x:          Option<i32>,
    /// Y coordinate to configure to
    pub(crate) y:          Option<i32>,
    /// Window width to configure to
    pub(crate) width:      Option<i32>,
    /// Window height to configure to
    pub(crate) height:     Option<i32>,
    /// Border width to configure to
    pub(crate) border:     Option<i32>,
    /// Sibling window of id. Used if stack_mode is set
    pub(crate) sibling:    Option<Window>,
    /// Stack mode to configure to
    pub(crate) stack_mode: Option<StackMode>,
}

impl ConfigureRequestData {
    /// Whether position or size is part of the request
    pub(crate) const fn has_position(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// Whether the width or height is part of the request
    pub(crate) const fn has_size(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    /// Build a request from a `_NET_MOVERESIZE_WINDOW` payload. Bits 8-11 of
    /// the first item select x, y, width and height.
    pub(crate) fn from_moveresize(window: Window, data: [u32; 5]) -> Self {
        let mask = (data[0] >> 8) & 0x0f;
        let field = |bit: u32, value: u32| (mask & (1 << bit) != 0).then(|| value as i32);

        Self {
            window,
            x: field(0, data[1]),
            y: field(1, data[2]),
            width: field(2, data[3]),
            height: field(3, data[4]),
            ..Self::default()
        }
    }
}

// ]]] === ConfigureRequest ===

// ============================= Property ============================= [[[

/// Properties whose changes the window manager follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyKind {
    /// `WM_NORMAL_HINTS`
    NormalHints,
    /// `_NET_WM_WINDOW_TYPE`
    WindowType,
    /// Anything else
    Other,
}

// ]]] === Property ===

// =========================== ClientMessage ========================== [[[

/// Source indication value meaning the request came from a pager acting on
/// direct user action
pub(crate) const SOURCE_PAGER: u32 = 2;

/// EWMH client messages the window manager understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NetMessage {
    /// `_NET_CURRENT_DESKTOP`
    CurrentDesktop(u32),
    /// `_NET_ACTIVE_WINDOW`
    ActiveWindow {
        source: u32,
    },
    /// `_NET_CLOSE_WINDOW`
    CloseWindow {
        source: u32,
    },
    /// `_NET_MOVERESIZE_WINDOW`
    MoveResizeWindow {
        /// Gravity in bits 0-7, fields in 8-11, source in 12-13
        flags:  u32,
        x:      u32,
        y:      u32,
        width:  u32,
        height: u32,
    },
    /// `_NET_RESTACK_WINDOW`
    RestackWindow {
        source:  u32,
        sibling: Window,
        detail:  u32,
    },
    /// `_NET_WM_DESKTOP`
    WmDesktop {
        desktop: u32,
        source:  u32,
    },
    /// `_NET_WM_STATE`
    WmState {
        /// 0 removes, 1 adds, 2 toggles
        action: u32,
        first:  Option<NetWmState>,
        second: Option<NetWmState>,
    },
    /// `_NET_REQUEST_FRAME_EXTENTS`
    RequestFrameExtents,
    /// Any other message type
    Other,
}

impl NetMessage {
    /// Source indication of a `_NET_MOVERESIZE_WINDOW` request
    pub(crate) const fn moveresize_source(flags: u32) -> u32 {
        (flags >> 12) & 3
    }

    /// Gravity of a `_NET_MOVERESIZE_WINDOW` request; 0 means the client's own
    pub(crate) const fn moveresize_gravity(flags: u32) -> u32 {
        flags & 0xff
    }
}

// ]]] === ClientMessage ===

// =============================== Error ============================== [[[

/// Broad classification of a protocol error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XErrorKind {
    /// The resource named a window that no longer exists
    Window,
    /// The request was refused
    Access,
    /// Any other error
    Other,
}

/// An error reported asynchronously for an earlier request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct XError {
    /// The offending resource
    pub(crate) bad_value: u32,
    pub(crate) kind:      XErrorKind,
    /// Major opcode of the failed request
    pub(crate) request:   u8,
}

// ]]] === Error ===

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moveresize_fields() {
        // Source 2, x and height present, gravity static
        let flags = (2 << 12) | (0b1001 << 8) | 10;
        let req = ConfigureRequestData::from_moveresize(0x42, [flags, 30, 40, 50, 60]);
        assert_eq!(req.x, Some(30));
        assert_eq!(req.y, None);
        assert_eq!(req.width, None);
        assert_eq!(req.height, Some(60));
        assert!(req.has_position() && req.has_size());
        assert_eq!(NetMessage::moveresize_source(flags), SOURCE_PAGER);
        assert_eq!(NetMessage::moveresize_gravity(flags), 10);
    }

    #[test]
    fn guard_preserving_events() {
        assert!(XEvent::DestroyNotify(1).preserves_guards());
        assert!(XEvent::UnmapNotify { window: 1, event: 2 }.preserves_guards());
        assert!(!XEvent::MapRequest(1).preserves_guards());
        assert!(!XEvent::Unknown(0).preserves_guards());
    }

    #[test]
    fn stack_modes() {
        assert_eq!(StackMode::from_detail(1), Some(StackMode::Below));
        assert_eq!(StackMode::from_detail(9), None);
    }
}
