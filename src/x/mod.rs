//! The boundary to the display server.
//!
//! [`XConn`] is the only way the window manager talks to X. The real
//! implementation lives in [`xconnection`]; tests use a recording mock.

pub(crate) mod event;
pub(crate) mod input;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod property;
pub(crate) mod xconnection;

use crate::{
    geometry::{Point, Rectangle},
    screen::Monitor,
};
use anyhow::Result;
use event::{ConfigureRequestData, XEvent};
use input::Keysym;
use property::{AllowedAction, Axis, IcccmWindowState, MotifHints, NetWmState, WindowType, WmSizeHints};

/// An X window id
pub(crate) type Window = x11rb::protocol::xproto::Window;
/// An X atom
pub(crate) type Atom = x11rb::protocol::xproto::Atom;
/// An X colormap id
pub(crate) type Colormap = x11rb::protocol::xproto::Colormap;

// ============================ Data types ============================ [[[

/// Root window of one protocol screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScreenInfo {
    pub(crate) root:     Window,
    pub(crate) width:    i32,
    pub(crate) height:   i32,
    pub(crate) colormap: Colormap,
}

/// The parts of a window's attributes and geometry the manager uses
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowAttributes {
    pub(crate) root:              Window,
    /// Position and size, excluding the border
    pub(crate) rect:              Rectangle,
    pub(crate) border:            i32,
    pub(crate) override_redirect: bool,
    /// Mapped and all ancestors mapped
    pub(crate) viewable:          bool,
    pub(crate) colormap:          Colormap,
}

/// Result of querying the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pointer {
    /// Root of the screen the pointer is on
    pub(crate) root:  Window,
    pub(crate) pos:   Point,
    /// Child of the queried window containing the pointer
    pub(crate) child: Option<Window>,
}

/// Cursor shown while the pointer is grabbed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CursorKind {
    /// Leave the cursor alone
    Normal,
    Move,
    Resize,
    /// Hidden, while cycling focus
    None,
}

// ]]] === Data types ===

// ============================== XConn =============================== [[[

/// Everything the window manager asks of the X server.
///
/// Requests are queued, not checked; errors caused by them come back later as
/// [`XEvent::Error`]. An `Err` from a request therefore means the connection
/// itself failed.
pub(crate) trait XConn {
    // ========================= Setup ========================= [[[

    /// All protocol screens
    fn screens(&self) -> Vec<ScreenInfo>;
    /// Outputs of a screen (RandR, then Xinerama). May be empty.
    fn monitors(&self, root: Window) -> Result<Vec<Monitor>>;
    /// Select substructure redirection on `root`, failing with
    /// [`Error::AnotherWmRunning`](crate::error::Error) if refused
    fn become_wm(&self, root: Window, screen: usize) -> Result<()>;
    /// Allocate a named (or `#rrggbb`) color, returning its pixel
    fn alloc_color(&self, colormap: Colormap, name: &str) -> Result<u32>;
    /// Create the `_NET_SUPPORTING_WM_CHECK` window
    fn create_supporting_window(&self, root: Window) -> Result<Window>;
    /// Children of `root`, bottom to top
    fn query_tree(&self, root: Window) -> Result<Vec<Window>>;
    /// Modifier bit that num-lock is mapped to, or 0
    fn numlock_mask(&self) -> Result<u16>;
    /// Re-read the keyboard mapping after a `MappingNotify`
    fn refresh_keymap(&mut self) -> Result<()>;
    fn keysym_to_keycodes(&self, sym: Keysym) -> Vec<u8>;
    /// First keysym of a keycode, unshifted
    fn keycode_to_keysym(&self, code: u8) -> Keysym;

    // ]]] === Setup ===

    // ========================= Events ======================== [[[

    /// Block for the next event. `None` means the wait was interrupted by a
    /// signal.
    fn next_event(&self) -> Result<Option<XEvent>>;
    /// Return an already received event, if any
    fn poll_event(&self) -> Result<Option<XEvent>>;
    fn flush(&self) -> bool;
    /// Flush and wait for the server to process everything sent
    fn sync(&self);

    // ]]] === Events ===

    // ======================== Queries ======================== [[[

    fn window_attributes(&self, window: Window) -> Result<WindowAttributes>;
    /// `_NET_WM_NAME`, falling back to `WM_NAME`
    fn window_name(&self, window: Window) -> Option<String>;
    /// `WM_CLASS` as (instance, class)
    fn window_class(&self, window: Window) -> Option<(String, String)>;
    fn window_types(&self, window: Window) -> WindowType;
    /// `_NET_WM_DESKTOP`
    fn window_desktop(&self, window: Window) -> Option<u32>;
    /// Pre-maximise (position, size) stored on the window
    fn unmaximised(&self, window: Window, axis: Axis) -> Option<(i32, i32)>;
    fn size_hints(&self, window: Window) -> Option<WmSizeHints>;
    fn motif_hints(&self, window: Window) -> Option<MotifHints>;
    /// Whether `WM_DELETE_WINDOW` is in `WM_PROTOCOLS`
    fn supports_delete(&self, window: Window) -> bool;
    fn query_pointer(&self, window: Window) -> Result<Pointer>;

    // ]]] === Queries ===

    // ======================== Requests ======================= [[[

    /// Listen for colormap, enter and property changes (and shape changes)
    fn select_client_input(&self, window: Window) -> Result<()>;
    /// Create an override-redirect frame at `rect` (origin of the frame,
    /// size of the client) with the given border
    fn create_frame(&self, root: Window, rect: Rectangle, border: i32, pixel: u32) -> Result<Window>;
    fn reparent(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()>;
    fn add_to_save_set(&self, window: Window) -> Result<()>;
    fn remove_from_save_set(&self, window: Window) -> Result<()>;
    fn set_border_width(&self, window: Window, width: i32) -> Result<()>;
    fn set_border_color(&self, window: Window, pixel: u32) -> Result<()>;
    fn map(&self, window: Window) -> Result<()>;
    fn unmap(&self, window: Window) -> Result<()>;
    fn destroy(&self, window: Window) -> Result<()>;
    fn move_window(&self, window: Window, x: i32, y: i32) -> Result<()>;
    fn move_resize(&self, window: Window, rect: Rectangle) -> Result<()>;
    /// Position, size and border of a frame in one request
    fn configure_frame(&self, window: Window, rect: Rectangle, border: i32) -> Result<()>;
    fn raise(&self, window: Window) -> Result<()>;
    fn lower(&self, window: Window) -> Result<()>;
    /// Restack `window` directly below `sibling`
    fn place_below(&self, window: Window, sibling: Window) -> Result<()>;
    /// Tell a client its geometry with a synthetic `ConfigureNotify`
    fn send_configure_notify(&self, window: Window, rect: Rectangle) -> Result<()>;
    /// Give the frame the bounding shape of a shaped client
    fn copy_shape(&self, frame: Window, window: Window) -> Result<()>;
    fn focus(&self, window: Window) -> Result<()>;
    fn focus_pointer_root(&self) -> Result<()>;
    fn install_colormap(&self, colormap: Colormap) -> Result<()>;
    fn kill_client(&self, window: Window) -> Result<()>;
    /// Send `WM_DELETE_WINDOW`
    fn send_delete(&self, window: Window) -> Result<()>;
    /// Pass a configure request of an unmanaged window through unchanged
    fn configure_unmanaged(&self, request: &ConfigureRequestData) -> Result<()>;

    // ]]] === Requests ===

    // ========================= Grabs ========================= [[[

    /// Grab the pointer on `root`; `false` if it is grabbed elsewhere
    fn grab_pointer(&self, root: Window, cursor: CursorKind) -> Result<bool>;
    fn ungrab_pointer(&self) -> Result<()>;
    fn grab_keyboard(&self, root: Window) -> Result<bool>;
    fn ungrab_keyboard(&self) -> Result<()>;
    fn grab_server(&self) -> Result<()>;
    fn ungrab_server(&self) -> Result<()>;
    fn grab_key(&self, window: Window, keycode: u8, modifiers: u16) -> Result<()>;
    fn ungrab_all_keys(&self, window: Window) -> Result<()>;
    fn grab_button(&self, window: Window, button: u8, modifiers: u16) -> Result<()>;
    fn ungrab_button(&self, window: Window, button: u8, modifiers: u16) -> Result<()>;
    fn ungrab_all_buttons(&self, window: Window) -> Result<()>;

    // ]]] === Grabs ===

    // ======================= Properties ====================== [[[

    fn set_wm_state(&self, window: Window, state: IcccmWindowState) -> Result<()>;
    fn set_net_wm_state(&self, window: Window, states: &[NetWmState]) -> Result<()>;
    fn set_allowed_actions(&self, window: Window, actions: &[AllowedAction]) -> Result<()>;
    fn delete_allowed_actions(&self, window: Window) -> Result<()>;
    fn set_frame_extents(&self, window: Window, border: i32) -> Result<()>;
    fn set_wm_desktop(&self, window: Window, desktop: u32) -> Result<()>;
    /// Store (or with `None`, delete) a pre-maximise pair
    fn set_unmaximised(&self, window: Window, axis: Axis, saved: Option<(i32, i32)>) -> Result<()>;
    /// Remove `_NET_WM_DESKTOP` and `_NET_WM_STATE` from a withdrawn window
    fn delete_client_hints(&self, window: Window) -> Result<()>;
    fn set_client_list(&self, root: Window, windows: &[Window]) -> Result<()>;
    fn set_client_list_stacking(&self, root: Window, windows: &[Window]) -> Result<()>;
    fn set_active_window(&self, root: Window, window: Option<Window>) -> Result<()>;
    fn set_number_of_desktops(&self, root: Window, count: u32) -> Result<()>;
    fn set_current_desktop(&self, root: Window, desktop: u32) -> Result<()>;
    /// Desktop geometry, viewport and work area all describe the whole root
    fn set_desktop_geometry(&self, root: Window, width: i32, height: i32) -> Result<()>;
    fn set_supported(&self, root: Window) -> Result<()>;
    /// Point the root at the check window and name it
    fn set_supporting_wm_check(&self, root: Window, check: Window) -> Result<()>;
    /// Remove every root property the manager published
    fn clear_root_hints(&self, root: Window) -> Result<()>;

    // ]]] === Properties ===

    // ======================== Drawing ======================== [[[

    /// Draw (or, drawn a second time, erase) an inverted outline on the root
    fn draw_outline(&self, root: Window, rect: Rectangle, border: i32, label: &str) -> Result<()>;
    fn text_width(&self, text: &str) -> i32;
    /// Font ascent and descent
    fn font_metrics(&self) -> (i32, i32);
    /// Create and map a small window at `rect` showing `lines`
    fn show_info(&self, root: Window, rect: Rectangle, lines: &[String], pixel: u32) -> Result<Window>;

    // ]]] === Drawing ===
}

// ]]] === XConn ===
