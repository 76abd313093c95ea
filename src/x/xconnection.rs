//! The connection to the X-Server, implementing [`XConn`] with [`x11rb`]

use super::{
    event::{
        ButtonEvent,
        ConfigureRequestData,
        KeyEvent,
        MotionEvent,
        NetMessage,
        PropertyKind,
        StackMode,
        XError,
        XErrorKind,
        XEvent,
    },
    input::Keysym,
    property::{
        AllowedAction,
        Axis,
        IcccmWindowState,
        MotifHints,
        NetWmState,
        WindowType,
        WmSizeHints,
        MOTIF_HINTS_LEN,
        WM_SIZE_HINTS_LEN,
    },
    Atom,
    Colormap,
    CursorKind,
    Pointer,
    ScreenInfo,
    Window,
    WindowAttributes,
    XConn,
};
use crate::{
    config::GlobalSettings,
    error::Error,
    geometry::{Point, Rectangle},
    screen::Monitor,
    WM_NAME,
};
use anyhow::{anyhow, bail, Context, Result};
use nix::{
    errno::Errno,
    poll::{poll, PollFd, PollFlags},
};
use std::os::unix::io::AsRawFd;
use x11rb::{
    atom_manager,
    connection::{Connection, RequestConnection},
    cursor::Handle as CursorHandle,
    errors::ReplyError,
    protocol::{
        randr::{self, ConnectionExt as _},
        shape::{self, ConnectionExt as _},
        xinerama::ConnectionExt as _,
        xproto::{
            self,
            AtomEnum,
            ButtonIndex,
            ChangeWindowAttributesAux,
            ClientMessageEvent,
            ConfigWindow,
            ConfigureNotifyEvent,
            ConfigureWindowAux,
            ConnectionExt,
            CreateGCAux,
            CreateWindowAux,
            EventMask,
            GrabMode,
            GrabStatus,
            InputFocus,
            MapState,
            Mapping,
            ModMask,
            PropMode,
            SetMode,
            SubwindowMode,
            GX,
        },
        ErrorKind,
        Event,
    },
    resource_manager::Database,
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
    CURRENT_TIME,
    NONE,
};

// ============================== Atoms =============================== [[[

/// Every atom the window manager reads, writes or receives. See the [ICCCM][1]
/// and the [EWMH][2].
///
/// [1]: https://tronche.com/gui/x/icccm/sec-4.html
/// [2]: https://specifications.freedesktop.org/wm-spec/wm-spec-latest.html
atom_manager! {
    pub(crate) Atoms: AtomsCookie {
        // UTF-8 encoded string data
        UTF8_STRING,

        // ============ ICCCM client properties ============ [[[
        // List of atoms identifying protocol between client and window
        WM_PROTOCOLS,
        // Has atom if prompt of deletion or deletion is about to happen
        WM_DELETE_WINDOW,
        // Top-level windows not in withdrawn have this tag
        WM_STATE, // ]]]

        // ============== EWMH root properties ============= [[[
        _NET_SUPPORTED,
        _NET_SUPPORTING_WM_CHECK,
        _NET_CLIENT_LIST,
        _NET_CLIENT_LIST_STACKING,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_DESKTOP_GEOMETRY,
        _NET_DESKTOP_VIEWPORT,
        _NET_CURRENT_DESKTOP,
        _NET_ACTIVE_WINDOW,
        _NET_WORKAREA, // ]]]

        // ============== EWMH root messages =============== [[[
        _NET_CLOSE_WINDOW,
        _NET_MOVERESIZE_WINDOW,
        _NET_RESTACK_WINDOW,
        _NET_REQUEST_FRAME_EXTENTS, // ]]]

        // ========== EWMH application properties ========== [[[
        _NET_WM_NAME,
        _NET_WM_PID,
        _NET_WM_DESKTOP,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_STATE,
        _NET_WM_ALLOWED_ACTIONS,
        _NET_FRAME_EXTENTS, // ]]]

        // === EWMH window types ===
        _NET_WM_WINDOW_TYPE_DESKTOP,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_WINDOW_TYPE_NOTIFICATION,

        // === EWMH window states ===
        _NET_WM_STATE_MAXIMIZED_VERT,
        _NET_WM_STATE_MAXIMIZED_HORZ,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_STATE_HIDDEN,
        _NET_WM_STATE_FOCUSED,

        // === EWMH allowed actions ===
        _NET_WM_ACTION_MOVE,
        _NET_WM_ACTION_RESIZE,
        _NET_WM_ACTION_MAXIMIZE_HORZ,
        _NET_WM_ACTION_MAXIMIZE_VERT,
        _NET_WM_ACTION_FULLSCREEN,
        _NET_WM_ACTION_CHANGE_DESKTOP,
        _NET_WM_ACTION_CLOSE,

        // Decoration hints of the Motif toolkit
        _MOTIF_WM_HINTS,
        // Pre-maximise geometry, kept across restarts
        _EVWM_UNMAXIMISED_HORZ,
        _EVWM_UNMAXIMISED_VERT,
    }
}

impl Atoms {
    fn net_wm_state(&self, state: NetWmState) -> Atom {
        match state {
            NetWmState::MaximizedVert => self._NET_WM_STATE_MAXIMIZED_VERT,
            NetWmState::MaximizedHorz => self._NET_WM_STATE_MAXIMIZED_HORZ,
            NetWmState::Fullscreen => self._NET_WM_STATE_FULLSCREEN,
            NetWmState::Hidden => self._NET_WM_STATE_HIDDEN,
            NetWmState::Focused => self._NET_WM_STATE_FOCUSED,
        }
    }

    fn net_wm_state_from(&self, atom: Atom) -> Option<NetWmState> {
        [
            NetWmState::MaximizedVert,
            NetWmState::MaximizedHorz,
            NetWmState::Fullscreen,
            NetWmState::Hidden,
            NetWmState::Focused,
        ]
        .into_iter()
        .find(|&s| self.net_wm_state(s) == atom)
    }

    fn allowed_action(&self, action: AllowedAction) -> Atom {
        match action {
            AllowedAction::Move => self._NET_WM_ACTION_MOVE,
            AllowedAction::Resize => self._NET_WM_ACTION_RESIZE,
            AllowedAction::MaximizeHorz => self._NET_WM_ACTION_MAXIMIZE_HORZ,
            AllowedAction::MaximizeVert => self._NET_WM_ACTION_MAXIMIZE_VERT,
            AllowedAction::Fullscreen => self._NET_WM_ACTION_FULLSCREEN,
            AllowedAction::ChangeDesktop => self._NET_WM_ACTION_CHANGE_DESKTOP,
            AllowedAction::Close => self._NET_WM_ACTION_CLOSE,
        }
    }

    const fn unmaximised(&self, axis: Axis) -> Atom {
        match axis {
            Axis::Horizontal => self._EVWM_UNMAXIMISED_HORZ,
            Axis::Vertical => self._EVWM_UNMAXIMISED_VERT,
        }
    }

    /// Everything advertised in `_NET_SUPPORTED`
    fn supported(&self) -> Vec<Atom> {
        vec![
            self._NET_SUPPORTED,
            self._NET_SUPPORTING_WM_CHECK,
            self._NET_CLIENT_LIST,
            self._NET_CLIENT_LIST_STACKING,
            self._NET_NUMBER_OF_DESKTOPS,
            self._NET_DESKTOP_GEOMETRY,
            self._NET_DESKTOP_VIEWPORT,
            self._NET_CURRENT_DESKTOP,
            self._NET_ACTIVE_WINDOW,
            self._NET_WORKAREA,
            self._NET_CLOSE_WINDOW,
            self._NET_MOVERESIZE_WINDOW,
            self._NET_RESTACK_WINDOW,
            self._NET_REQUEST_FRAME_EXTENTS,
            self._NET_WM_NAME,
            self._NET_WM_DESKTOP,
            self._NET_WM_WINDOW_TYPE,
            self._NET_WM_WINDOW_TYPE_DESKTOP,
            self._NET_WM_WINDOW_TYPE_DOCK,
            self._NET_WM_WINDOW_TYPE_NOTIFICATION,
            self._NET_WM_STATE,
            self._NET_WM_STATE_MAXIMIZED_VERT,
            self._NET_WM_STATE_MAXIMIZED_HORZ,
            self._NET_WM_STATE_FULLSCREEN,
            self._NET_WM_STATE_HIDDEN,
            self._NET_WM_STATE_FOCUSED,
            self._NET_WM_ALLOWED_ACTIONS,
            self._NET_WM_ACTION_MOVE,
            self._NET_WM_ACTION_RESIZE,
            self._NET_WM_ACTION_MAXIMIZE_HORZ,
            self._NET_WM_ACTION_MAXIMIZE_VERT,
            self._NET_WM_ACTION_FULLSCREEN,
            self._NET_WM_ACTION_CHANGE_DESKTOP,
            self._NET_WM_ACTION_CLOSE,
            self._NET_FRAME_EXTENTS,
        ]
    }

    /// Root properties removed again on shutdown
    fn root_hints(&self) -> [Atom; 10] {
        [
            self._NET_SUPPORTED,
            self._NET_SUPPORTING_WM_CHECK,
            self._NET_CLIENT_LIST,
            self._NET_CLIENT_LIST_STACKING,
            self._NET_NUMBER_OF_DESKTOPS,
            self._NET_DESKTOP_GEOMETRY,
            self._NET_DESKTOP_VIEWPORT,
            self._NET_CURRENT_DESKTOP,
            self._NET_ACTIVE_WINDOW,
            self._NET_WORKAREA,
        ]
    }
}

// ]]] === Atoms ===

// ============================== Helpers ============================= [[[

/// `AnyKey` in a key grab
const ANY_KEY: u8 = 0;
/// `PointerRoot` as a focus target
const POINTER_ROOT: Window = 1;

/// Events selected on every root
fn root_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
        | EventMask::ENTER_WINDOW
        | EventMask::COLOR_MAP_CHANGE
}

/// Events selected on every frame
fn frame_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::BUTTON_PRESS
        | EventMask::BUTTON_RELEASE
        | EventMask::ENTER_WINDOW
}

/// Events selected on every client
fn client_event_mask() -> EventMask {
    EventMask::COLOR_MAP_CHANGE | EventMask::ENTER_WINDOW | EventMask::PROPERTY_CHANGE
}

/// Events wanted while the pointer is grabbed
fn pointer_grab_mask() -> u16 {
    u32::from(EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION) as u16
}

/// Parse `#rrggbb` (or `#rgb`) into 16-bit channels
fn parse_hex_color(name: &str) -> Option<(u16, u16, u16)> {
    let hex = name.strip_prefix('#')?;
    let scale = match hex.len() {
        3 => 0x1111,
        6 => 0x0101,
        _ => return None,
    };
    let width = hex.len() / 3;
    let channel = |i: usize| {
        u16::from_str_radix(hex.get(i * width..(i + 1) * width)?, 16)
            .ok()
            .map(|c| c * scale)
    };

    Some((channel(0)?, channel(1)?, channel(2)?))
}

/// Encode a string as a single `TEXTITEM8`
fn text_item(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let len = bytes.len().min(254);
    let mut item = Vec::with_capacity(len + 2);
    item.push(len as u8);
    item.push(0);
    item.extend_from_slice(&bytes[..len]);
    item
}

const fn to_stack_mode(mode: StackMode) -> xproto::StackMode {
    match mode {
        StackMode::Above => xproto::StackMode::ABOVE,
        StackMode::Below => xproto::StackMode::BELOW,
        StackMode::TopIf => xproto::StackMode::TOP_IF,
        StackMode::BottomIf => xproto::StackMode::BOTTOM_IF,
        StackMode::Opposite => xproto::StackMode::OPPOSITE,
    }
}

// ]]] === Helpers ===

// ============================== Keymap ============================== [[[

/// The keyboard mapping, as returned by `GetKeyboardMapping`
#[derive(Debug)]
struct Keymap {
    min_keycode: u8,
    per_code:    usize,
    keysyms:     Vec<Keysym>,
}

impl Keymap {
    fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(min, max - min + 1)
            .context("failed to get keyboard mapping")?
            .reply()
            .context("failed to get keyboard mapping reply")?;

        Ok(Self {
            min_keycode: min,
            per_code:    usize::from(reply.keysyms_per_keycode),
            keysyms:     reply.keysyms,
        })
    }

    fn rows(&self) -> impl Iterator<Item = (u8, &[Keysym])> + '_ {
        let min = self.min_keycode;
        self.keysyms
            .chunks(self.per_code.max(1))
            .enumerate()
            .map(move |(i, row)| (min.saturating_add(i as u8), row))
    }

    fn keycodes(&self, sym: Keysym) -> Vec<u8> {
        self.rows()
            .filter(|(_, row)| row.contains(&sym))
            .map(|(code, _)| code)
            .collect()
    }

    fn keysym(&self, code: u8) -> Keysym {
        self.rows()
            .find(|&(c, _)| c == code)
            .and_then(|(_, row)| row.first().copied())
            .unwrap_or(0)
    }
}

// ]]] === Keymap ===

// ================================ Font ============================== [[[

/// A core font with the metrics needed to lay out text
#[derive(Debug)]
struct Font {
    id:            xproto::Font,
    ascent:        i32,
    descent:       i32,
    /// First character described by `widths`
    min_char:      u16,
    widths:        Vec<i16>,
    default_width: i16,
}

impl Font {
    fn open(conn: &RustConnection, name: &str) -> Result<Self> {
        let id = conn.generate_id().context("failed to generate an ID")?;
        let opened = conn
            .open_font(id, name.as_bytes())
            .context(format!("failed to open font {}", name))?
            .check();

        if let Err(e) = opened {
            log::warn!("unable to load font '{}', falling back to 'fixed': {}", name, e);
            conn.open_font(id, b"fixed")
                .context("failed to open font fixed")?
                .check()
                .context("failed to check opening font fixed")?;
        }

        let reply = conn
            .query_font(id)
            .context("failed to query font")?
            .reply()
            .context("failed to get query font reply")?;

        // Two-byte fonts only get the widths of their first row
        let min_char = if reply.min_byte1 == 0 { reply.min_char_or_byte2 } else { 0 };

        Ok(Self {
            id,
            ascent: i32::from(reply.font_ascent),
            descent: i32::from(reply.font_descent),
            min_char,
            widths: reply.char_infos.iter().map(|c| c.character_width).collect(),
            default_width: reply.max_bounds.character_width,
        })
    }

    fn text_width(&self, text: &str) -> i32 {
        text.bytes()
            .map(|b| {
                u16::from(b)
                    .checked_sub(self.min_char)
                    .and_then(|i| self.widths.get(usize::from(i)))
                    .copied()
                    .unwrap_or(self.default_width)
            })
            .map(i32::from)
            .sum()
    }
}

// ]]] === Font ===

// =========================== XConnection ============================ [[[

/// Per-root resources
#[derive(Debug)]
struct RootResources {
    info:    ScreenInfo,
    /// Inverting context for outlines
    xor_gc:  xproto::Gcontext,
    /// Black on white, for the info banner
    text_gc: xproto::Gcontext,
    white:   u32,
}

/// Cursors shown during pointer grabs
#[derive(Debug, Default, Clone, Copy)]
struct Cursors {
    moving:   xproto::Cursor,
    resizing: xproto::Cursor,
    blank:    xproto::Cursor,
}

/// The main connection to the X-Server
pub(crate) struct XConnection {
    /// Connection to the X-Server
    conn:      RustConnection,
    /// The [`Atoms`] of the connection
    atoms:     Atoms,
    roots:     Vec<RootResources>,
    keymap:    Keymap,
    font:      Font,
    cursors:   Cursors,
    has_shape: bool,
    has_randr: bool,
}

impl XConnection {
    /// Create a new [`XConnection`], loading everything that does not depend
    /// on being the window manager
    pub(crate) fn new(conn: RustConnection, settings: &GlobalSettings) -> Result<Self> {
        log::trace!("creating a new `XConnection`");

        log::debug!("interning Atoms");
        let atoms = Atoms::new(&conn)
            .context("failed to get `Atoms`")?
            .reply()
            .context("failed to get `Atoms` reply")?;

        let has_shape = conn
            .extension_information(shape::X11_EXTENSION_NAME)
            .context("failed to query the shape extension")?
            .is_some();
        let has_randr = conn
            .extension_information(randr::X11_EXTENSION_NAME)
            .context("failed to query the randr extension")?
            .is_some();
        log::debug!("extensions: shape={}, randr={}", has_shape, has_randr);

        let font = Font::open(&conn, &settings.font)?;
        let keymap = Keymap::load(&conn)?;
        let cursors = Self::load_cursors(&conn)?;

        let mut roots = vec![];
        for screen in &conn.setup().roots {
            let xor_gc = conn.generate_id().context("failed to generate an ID")?;
            conn.create_gc(
                xor_gc,
                screen.root,
                &CreateGCAux::new()
                    .function(GX::INVERT)
                    .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS)
                    .line_width(1)
                    .font(font.id),
            )
            .context("failed to create outline graphics context")?;

            let text_gc = conn.generate_id().context("failed to generate an ID")?;
            conn.create_gc(
                text_gc,
                screen.root,
                &CreateGCAux::new()
                    .foreground(screen.black_pixel)
                    .background(screen.white_pixel)
                    .font(font.id),
            )
            .context("failed to create text graphics context")?;

            roots.push(RootResources {
                info: ScreenInfo {
                    root:     screen.root,
                    width:    i32::from(screen.width_in_pixels),
                    height:   i32::from(screen.height_in_pixels),
                    colormap: screen.default_colormap,
                },
                xor_gc,
                text_gc,
                white: screen.white_pixel,
            });
        }

        Ok(Self {
            conn,
            atoms,
            roots,
            keymap,
            font,
            cursors,
            has_shape,
            has_randr,
        })
    }

    /// Load the cursors through the cursor theme, plus an invisible one
    fn load_cursors(conn: &RustConnection) -> Result<Cursors> {
        log::debug!("loading cursors");
        let mut cursors = Cursors::default();

        match Database::new_from_default(conn) {
            Ok(db) => {
                let handle = CursorHandle::new(conn, 0, &db)
                    .context("failed to create cursor handle")?
                    .reply()
                    .context("failed to get cursor handle reply")?;
                cursors.moving = handle.load_cursor(conn, "fleur").unwrap_or(NONE);
                cursors.resizing = handle.load_cursor(conn, "bottom_right_corner").unwrap_or(NONE);
            },
            Err(e) => log::warn!("failed to read the resource database: {}", e),
        }

        if let Some(screen) = conn.setup().roots.first() {
            let pixmap = conn.generate_id().context("failed to generate an ID")?;
            conn.create_pixmap(1, pixmap, screen.root, 1, 1)
                .context("failed to create cursor pixmap")?;
            let blank = conn.generate_id().context("failed to generate an ID")?;
            conn.create_cursor(blank, pixmap, pixmap, 0, 0, 0, 0, 0, 0, 0, 0)
                .context("failed to create blank cursor")?;
            conn.free_pixmap(pixmap).context("failed to free cursor pixmap")?;
            cursors.blank = blank;
        }

        Ok(cursors)
    }

    /// Resources of the screen `root` belongs to
    fn root(&self, root: Window) -> Result<&RootResources> {
        self.roots
            .iter()
            .find(|r| r.info.root == root)
            .ok_or_else(|| anyhow!("Window({:#0x}) is not a root window", root))
    }

    /// First `len` items of a 32-bit property
    fn property32(&self, window: Window, property: Atom, type_: Atom, len: u32) -> Option<Vec<u32>> {
        self.conn
            .get_property(false, window, property, type_, 0, len)
            .ok()?
            .reply()
            .ok()?
            .value32()
            .map(Iterator::collect)
    }

    /// A text property, as raw bytes
    fn property8(&self, window: Window, property: Atom, type_: Atom) -> Option<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, u32::MAX)
            .ok()?
            .reply()
            .ok()?;
        (reply.format == 8 && !reply.value.is_empty()).then(|| reply.value)
    }

    fn set_cardinals(&self, window: Window, property: Atom, values: &[u32]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, AtomEnum::CARDINAL, values)
            .context(format!("failed to set `{}` on Window({:#0x})", property, window))?;
        Ok(())
    }

    fn set_atoms(&self, window: Window, property: Atom, values: &[Atom]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, AtomEnum::ATOM, values)
            .context(format!("failed to set `{}` on Window({:#0x})", property, window))?;
        Ok(())
    }

    fn set_windows(&self, window: Window, property: Atom, values: &[Window]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, AtomEnum::WINDOW, values)
            .context(format!("failed to set `{}` on Window({:#0x})", property, window))?;
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<()> {
        self.conn
            .delete_property(window, property)
            .context(format!("failed to delete `{}` from Window({:#0x})", property, window))?;
        Ok(())
    }

    fn configure(&self, window: Window, aux: &ConfigureWindowAux) -> Result<()> {
        self.conn
            .configure_window(window, aux)
            .context(format!("failed to configure Window({:#0x})", window))?;
        Ok(())
    }

    /// Outputs reported by RandR 1.5
    fn randr_monitors(&self, root: Window) -> Result<Vec<Monitor>> {
        let reply = self
            .conn
            .randr_get_monitors(root, true)
            .context("failed to get randr monitors")?
            .reply()
            .context("failed to get randr monitors reply")?;

        let mut monitors = vec![];
        for m in reply.monitors {
            let name = self
                .conn
                .get_atom_name(m.name)
                .ok()
                .and_then(|cookie| cookie.reply().ok())
                .map(|reply| String::from_utf8_lossy(&reply.name).into_owned());
            let rect = Rectangle::new(
                i32::from(m.x),
                i32::from(m.y),
                i32::from(m.width),
                i32::from(m.height),
            );
            monitors.push(Monitor::new(rect, name));
        }

        Ok(monitors)
    }

    /// Heads reported by Xinerama
    fn xinerama_monitors(&self) -> Result<Vec<Monitor>> {
        let active = self
            .conn
            .xinerama_is_active()
            .context("failed to query xinerama")?
            .reply()
            .context("failed to get xinerama reply")?;
        if active.state == 0 {
            return Ok(vec![]);
        }

        let reply = self
            .conn
            .xinerama_query_screens()
            .context("failed to query xinerama screens")?
            .reply()
            .context("failed to get xinerama screens reply")?;

        Ok(reply
            .screen_info
            .iter()
            .map(|s| {
                let rect = Rectangle::new(
                    i32::from(s.x_org),
                    i32::from(s.y_org),
                    i32::from(s.width),
                    i32::from(s.height),
                );
                Monitor::new(rect, None)
            })
            .collect())
    }

    // ====================== Event conversion ==================== [[[

    /// Decode a protocol event
    fn convert_event(&self, event: Event) -> XEvent {
        let child = |w: Window| (w != NONE).then(|| w);

        match event {
            Event::KeyPress(e) | Event::KeyRelease(e) => {
                let key = KeyEvent {
                    root:     e.root,
                    window:   e.event,
                    child:    child(e.child),
                    root_pos: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                    state:    u16::from(e.state),
                    keycode:  e.detail,
                    time:     e.time,
                };
                if e.response_type & 0x7f == xproto::KEY_PRESS_EVENT {
                    XEvent::KeyPress(key)
                } else {
                    XEvent::KeyRelease(key)
                }
            },
            Event::ButtonPress(e) | Event::ButtonRelease(e) => {
                let button = ButtonEvent {
                    root:     e.root,
                    window:   e.event,
                    child:    child(e.child),
                    root_pos: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                    state:    u16::from(e.state),
                    button:   e.detail,
                    time:     e.time,
                };
                if e.response_type & 0x7f == xproto::BUTTON_PRESS_EVENT {
                    XEvent::ButtonPress(button)
                } else {
                    XEvent::ButtonRelease(button)
                }
            },
            Event::MotionNotify(e) => XEvent::Motion(MotionEvent {
                root:     e.root,
                root_pos: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                state:    u16::from(e.state),
                time:     e.time,
            }),
            Event::ConfigureRequest(e) => {
                let mask = u16::from(e.value_mask);
                let has = |bit: ConfigWindow| mask & u16::from(bit) != 0;

                XEvent::ConfigureRequest(ConfigureRequestData {
                    window:     e.window,
                    x:          has(ConfigWindow::X).then(|| i32::from(e.x)),
                    y:          has(ConfigWindow::Y).then(|| i32::from(e.y)),
                    width:      has(ConfigWindow::WIDTH).then(|| i32::from(e.width)),
                    height:     has(ConfigWindow::HEIGHT).then(|| i32::from(e.height)),
                    border:     has(ConfigWindow::BORDER_WIDTH).then(|| i32::from(e.border_width)),
                    sibling:    has(ConfigWindow::SIBLING).then(|| e.sibling),
                    stack_mode: has(ConfigWindow::STACK_MODE)
                        .then(|| StackMode::from_detail(u32::from(e.stack_mode)))
                        .flatten(),
                })
            },
            Event::ConfigureNotify(e) => XEvent::ConfigureNotify(e.window),
            Event::MapRequest(e) => XEvent::MapRequest(e.window),
            Event::UnmapNotify(e) => XEvent::UnmapNotify {
                window: e.window,
                event:  e.event,
            },
            Event::DestroyNotify(e) => XEvent::DestroyNotify(e.window),
            Event::EnterNotify(e) => XEvent::EnterNotify(e.event),
            Event::ColormapNotify(e) => XEvent::ColormapNotify {
                window:   e.window,
                colormap: e.colormap,
                new:      e.new,
            },
            Event::PropertyNotify(e) => {
                let kind = if e.atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
                    PropertyKind::NormalHints
                } else if e.atom == self.atoms._NET_WM_WINDOW_TYPE {
                    PropertyKind::WindowType
                } else {
                    PropertyKind::Other
                };
                XEvent::PropertyNotify { window: e.window, kind }
            },
            Event::ClientMessage(e) => XEvent::ClientMessage {
                window:  e.window,
                message: self.convert_message(e.type_, e.data.as_data32()),
            },
            Event::MappingNotify(e) => XEvent::MappingNotify {
                keyboard: e.request == Mapping::KEYBOARD,
            },
            Event::ShapeNotify(e) => XEvent::ShapeNotify(e.affected_window),
            Event::RandrScreenChangeNotify(e) => XEvent::ScreenChange {
                root:   e.root,
                width:  i32::from(e.width),
                height: i32::from(e.height),
            },
            Event::Error(e) => XEvent::Error(XError {
                bad_value: e.bad_value,
                kind:      match e.error_kind {
                    ErrorKind::Window => XErrorKind::Window,
                    ErrorKind::Access => XErrorKind::Access,
                    _ => XErrorKind::Other,
                },
                request:   e.major_opcode,
            }),
            other => {
                log::trace!("ignoring event: {:?}", other);
                XEvent::Unknown(0)
            },
        }
    }

    /// Decode the EWMH client messages the window manager handles
    fn convert_message(&self, type_: Atom, data: [u32; 5]) -> NetMessage {
        let a = &self.atoms;

        if type_ == a._NET_CURRENT_DESKTOP {
            NetMessage::CurrentDesktop(data[0])
        } else if type_ == a._NET_ACTIVE_WINDOW {
            NetMessage::ActiveWindow { source: data[0] }
        } else if type_ == a._NET_CLOSE_WINDOW {
            NetMessage::CloseWindow { source: data[1] }
        } else if type_ == a._NET_MOVERESIZE_WINDOW {
            NetMessage::MoveResizeWindow {
                flags:  data[0],
                x:      data[1],
                y:      data[2],
                width:  data[3],
                height: data[4],
            }
        } else if type_ == a._NET_RESTACK_WINDOW {
            NetMessage::RestackWindow {
                source:  data[0],
                sibling: data[1],
                detail:  data[2],
            }
        } else if type_ == a._NET_WM_DESKTOP {
            NetMessage::WmDesktop {
                desktop: data[0],
                source:  data[1],
            }
        } else if type_ == a._NET_WM_STATE {
            NetMessage::WmState {
                action: data[0],
                first:  a.net_wm_state_from(data[1]),
                second: a.net_wm_state_from(data[2]),
            }
        } else if type_ == a._NET_REQUEST_FRAME_EXTENTS {
            NetMessage::RequestFrameExtents
        } else {
            NetMessage::Other
        }
    }

    // ]]] === Event conversion ===
}

impl XConn for XConnection {
    // ========================= Setup ========================= [[[

    fn screens(&self) -> Vec<ScreenInfo> {
        self.roots.iter().map(|r| r.info).collect()
    }

    fn monitors(&self, root: Window) -> Result<Vec<Monitor>> {
        if self.has_randr {
            match self.randr_monitors(root) {
                Ok(monitors) if !monitors.is_empty() => return Ok(monitors),
                Ok(_) => {},
                Err(e) => log::debug!("randr monitors unavailable: {}", e),
            }
        }

        // Xinerama describes the first screen only
        if self.roots.first().map(|r| r.info.root) != Some(root) {
            return Ok(vec![]);
        }
        match self.xinerama_monitors() {
            Ok(monitors) => Ok(monitors),
            Err(e) => {
                log::debug!("xinerama unavailable: {}", e);
                Ok(vec![])
            },
        }
    }

    fn become_wm(&self, root: Window, screen: usize) -> Result<()> {
        log::debug!("attempting to become the window manager on screen {}", screen);

        if let Err(ReplyError::X11Error(err)) = self
            .conn
            .change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(root_event_mask()))
            .context("failed to select root events")?
            .check()
        {
            if err.error_kind == ErrorKind::Access {
                return Err(Error::AnotherWmRunning(screen).into());
            }
            bail!("failed to select events on root Window({:#0x})", root);
        }

        if self.has_randr {
            self.conn
                .randr_select_input(root, randr::NotifyMask::SCREEN_CHANGE)
                .context("failed to select randr input")?;
        }

        Ok(())
    }

    fn alloc_color(&self, colormap: Colormap, name: &str) -> Result<u32> {
        let reply = match parse_hex_color(name) {
            Some((r, g, b)) => self
                .conn
                .alloc_color(colormap, r, g, b)
                .context(format!("failed to allocate color {}", name))?
                .reply()
                .map(|reply| reply.pixel),
            None => self
                .conn
                .alloc_named_color(colormap, name.as_bytes())
                .context(format!("failed to allocate color {}", name))?
                .reply()
                .map(|reply| reply.pixel),
        };

        reply.with_context(|| format!("unknown color '{}'", name))
    }

    fn create_supporting_window(&self, root: Window) -> Result<Window> {
        let wid = self.conn.generate_id().context("failed to generate an ID")?;
        log::debug!("creating the supporting window: {:#0x}", wid);

        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                wid,
                root,
                -1,
                -1,
                1,
                1,
                0,
                xproto::WindowClass::INPUT_ONLY,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new().override_redirect(1),
            )
            .context(format!("failed to create Window({:#0x})", wid))?;

        Ok(wid)
    }

    fn query_tree(&self, root: Window) -> Result<Vec<Window>> {
        Ok(self
            .conn
            .query_tree(root)
            .context(format!("failed to query tree of Window({:#0x})", root))?
            .reply()
            .context(format!("failed to get tree of Window({:#0x})", root))?
            .children)
    }

    fn numlock_mask(&self) -> Result<u16> {
        let reply = self
            .conn
            .get_modifier_mapping()
            .context("failed to get modifier mapping")?
            .reply()
            .context("failed to get modifier mapping reply")?;

        let numlock = self.keymap.keycodes(0xff7f);
        let per_modifier = usize::from(reply.keycodes_per_modifier());

        Ok(reply
            .keycodes
            .chunks(per_modifier.max(1))
            .position(|codes| codes.iter().any(|c| *c != 0 && numlock.contains(c)))
            .map_or(0, |i| 1 << i))
    }

    fn refresh_keymap(&mut self) -> Result<()> {
        log::debug!("reloading the keyboard mapping");
        self.keymap = Keymap::load(&self.conn)?;
        Ok(())
    }

    fn keysym_to_keycodes(&self, sym: Keysym) -> Vec<u8> {
        self.keymap.keycodes(sym)
    }

    fn keycode_to_keysym(&self, code: u8) -> Keysym {
        self.keymap.keysym(code)
    }

    // ]]] === Setup ===

    // ========================= Events ======================== [[[

    fn next_event(&self) -> Result<Option<XEvent>> {
        loop {
            if let Some(event) = self.poll_event()? {
                return Ok(Some(event));
            }
            self.flush();

            let mut fds = [PollFd::new(self.conn.stream().as_raw_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, -1) {
                Ok(_) => {},
                Err(Errno::EINTR) => return Ok(None),
                Err(e) => bail!("failed to wait for the X-Server: {}", e),
            }
        }
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        Ok(self
            .conn
            .poll_for_event()
            .context("failed to poll for next event")?
            .map(|e| self.convert_event(e)))
    }

    fn flush(&self) -> bool {
        if let Err(e) = self.conn.flush() {
            log::warn!("failed to flush actions to X-server: {e}");
            return false;
        }

        true
    }

    fn sync(&self) {
        if let Err(e) = self.conn.sync() {
            log::warn!("failed to sync events with X-server: {e}");
        }
    }

    // ]]] === Events ===

    // ======================== Queries ======================== [[[

    fn window_attributes(&self, window: Window) -> Result<WindowAttributes> {
        let attrs = self
            .conn
            .get_window_attributes(window)
            .context(format!("failed to get attributes of Window({:#0x})", window))?
            .reply()
            .context(format!("failed to get attributes reply of Window({:#0x})", window))?;
        let geom = self
            .conn
            .get_geometry(window)
            .context(format!("failed to get geometry of Window({:#0x})", window))?
            .reply()
            .context(format!("failed to get geometry reply of Window({:#0x})", window))?;

        Ok(WindowAttributes {
            root:              geom.root,
            rect:              Rectangle::new(
                i32::from(geom.x),
                i32::from(geom.y),
                i32::from(geom.width),
                i32::from(geom.height),
            ),
            border:            i32::from(geom.border_width),
            override_redirect: attrs.override_redirect,
            viewable:          attrs.map_state == MapState::VIEWABLE,
            colormap:          attrs.colormap,
        })
    }

    fn window_name(&self, window: Window) -> Option<String> {
        self.property8(window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING)
            .or_else(|| self.property8(window, AtomEnum::WM_NAME.into(), AtomEnum::ANY.into()))
            .map(|name| String::from_utf8_lossy(&name).into_owned())
    }

    fn window_class(&self, window: Window) -> Option<(String, String)> {
        let raw = self.property8(window, AtomEnum::WM_CLASS.into(), AtomEnum::STRING.into())?;
        let mut parts = raw.split(|b| *b == 0).map(|s| String::from_utf8_lossy(s).into_owned());

        Some((parts.next().unwrap_or_default(), parts.next().unwrap_or_default()))
    }

    fn window_types(&self, window: Window) -> WindowType {
        let a = &self.atoms;
        self.property32(window, a._NET_WM_WINDOW_TYPE, AtomEnum::ATOM.into(), u32::MAX)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|atom| {
                if atom == a._NET_WM_WINDOW_TYPE_DESKTOP {
                    Some(WindowType::DESKTOP)
                } else if atom == a._NET_WM_WINDOW_TYPE_DOCK {
                    Some(WindowType::DOCK)
                } else if atom == a._NET_WM_WINDOW_TYPE_NOTIFICATION {
                    Some(WindowType::NOTIFICATION)
                } else {
                    None
                }
            })
            .fold(WindowType::empty(), |types, t| types | t)
    }

    fn window_desktop(&self, window: Window) -> Option<u32> {
        self.property32(window, self.atoms._NET_WM_DESKTOP, AtomEnum::CARDINAL.into(), 1)?
            .first()
            .copied()
    }

    fn unmaximised(&self, window: Window, axis: Axis) -> Option<(i32, i32)> {
        match self
            .property32(window, self.atoms.unmaximised(axis), AtomEnum::CARDINAL.into(), 2)?
            .as_slice()
        {
            &[pos, size] => Some((pos as i32, size as i32)),
            _ => None,
        }
    }

    fn size_hints(&self, window: Window) -> Option<WmSizeHints> {
        let raw = self.property32(
            window,
            AtomEnum::WM_NORMAL_HINTS.into(),
            AtomEnum::WM_SIZE_HINTS.into(),
            WM_SIZE_HINTS_LEN as u32,
        )?;
        WmSizeHints::from_raw(&raw)
    }

    fn motif_hints(&self, window: Window) -> Option<MotifHints> {
        let raw = self.property32(
            window,
            self.atoms._MOTIF_WM_HINTS,
            AtomEnum::ANY.into(),
            MOTIF_HINTS_LEN as u32,
        )?;
        MotifHints::from_raw(&raw)
    }

    fn supports_delete(&self, window: Window) -> bool {
        self.property32(window, self.atoms.WM_PROTOCOLS, AtomEnum::ATOM.into(), u32::MAX)
            .map_or(false, |protocols| protocols.contains(&self.atoms.WM_DELETE_WINDOW))
    }

    fn query_pointer(&self, window: Window) -> Result<Pointer> {
        let reply = self
            .conn
            .query_pointer(window)
            .context(format!("failed to query pointer on Window({:#0x})", window))?
            .reply()
            .context("failed to get query pointer reply")?;

        Ok(Pointer {
            root:  reply.root,
            pos:   Point::new(i32::from(reply.root_x), i32::from(reply.root_y)),
            child: (reply.child != NONE).then(|| reply.child),
        })
    }

    // ]]] === Queries ===

    // ======================== Requests ======================= [[[

    fn select_client_input(&self, window: Window) -> Result<()> {
        self.conn
            .change_window_attributes(
                window,
                &ChangeWindowAttributesAux::new().event_mask(client_event_mask()),
            )
            .context(format!("failed to select input on Window({:#0x})", window))?;

        if self.has_shape {
            self.conn
                .shape_select_input(window, true)
                .context(format!("failed to select shape input on Window({:#0x})", window))?;
        }

        Ok(())
    }

    fn create_frame(&self, root: Window, rect: Rectangle, border: i32, pixel: u32) -> Result<Window> {
        let wid = self.conn.generate_id().context("failed to generate an ID")?;
        log::debug!("creating a frame {:#0x}: Rectangle({})", wid, rect);
        let aux = CreateWindowAux::new()
            .override_redirect(1)
            .border_pixel(pixel)
            .event_mask(frame_event_mask());

        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                wid,
                root,
                rect.x as i16,
                rect.y as i16,
                rect.width.max(1) as u16,
                rect.height.max(1) as u16,
                border as u16,
                xproto::WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &aux,
            )
            .context(format!("failed to create Window({:#0x})", wid))?;

        Ok(wid)
    }

    fn reparent(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        log::debug!("reparenting Window({:#0x}) to Window({:#0x})", window, parent);
        self.conn
            .reparent_window(window, parent, x as i16, y as i16)
            .context(format!("failed to reparent Window({:#0x})", window))?;
        Ok(())
    }

    fn add_to_save_set(&self, window: Window) -> Result<()> {
        self.conn
            .change_save_set(SetMode::INSERT, window)
            .context(format!("failed to add Window({:#0x}) to the save set", window))?;
        Ok(())
    }

    fn remove_from_save_set(&self, window: Window) -> Result<()> {
        self.conn
            .change_save_set(SetMode::DELETE, window)
            .context(format!("failed to remove Window({:#0x}) from the save set", window))?;
        Ok(())
    }

    fn set_border_width(&self, window: Window, width: i32) -> Result<()> {
        self.configure(window, &ConfigureWindowAux::new().border_width(width as u32))
    }

    fn set_border_color(&self, window: Window, pixel: u32) -> Result<()> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(pixel))
            .context(format!("failed to set Window({:#0x}) border color", window))?;
        Ok(())
    }

    fn map(&self, window: Window) -> Result<()> {
        self.conn
            .map_window(window)
            .context(format!("failed to map Window({:#0x})", window))?;
        Ok(())
    }

    fn unmap(&self, window: Window) -> Result<()> {
        self.conn
            .unmap_window(window)
            .context(format!("failed to unmap Window({:#0x})", window))?;
        Ok(())
    }

    fn destroy(&self, window: Window) -> Result<()> {
        self.conn
            .destroy_window(window)
            .context(format!("failed to destroy Window({:#0x})", window))?;
        Ok(())
    }

    fn move_window(&self, window: Window, x: i32, y: i32) -> Result<()> {
        self.configure(window, &ConfigureWindowAux::new().x(x).y(y))
    }

    fn move_resize(&self, window: Window, rect: Rectangle) -> Result<()> {
        self.configure(
            window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width.max(1) as u32)
                .height(rect.height.max(1) as u32),
        )
    }

    fn configure_frame(&self, window: Window, rect: Rectangle, border: i32) -> Result<()> {
        self.configure(
            window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width.max(1) as u32)
                .height(rect.height.max(1) as u32)
                .border_width(border as u32),
        )
    }

    fn raise(&self, window: Window) -> Result<()> {
        self.configure(window, &ConfigureWindowAux::new().stack_mode(xproto::StackMode::ABOVE))
    }

    fn lower(&self, window: Window) -> Result<()> {
        self.configure(window, &ConfigureWindowAux::new().stack_mode(xproto::StackMode::BELOW))
    }

    fn place_below(&self, window: Window, sibling: Window) -> Result<()> {
        self.configure(
            window,
            &ConfigureWindowAux::new()
                .sibling(sibling)
                .stack_mode(xproto::StackMode::BELOW),
        )
    }

    fn send_configure_notify(&self, window: Window, rect: Rectangle) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type:     xproto::CONFIGURE_NOTIFY_EVENT,
            sequence:          0,
            event:             window,
            window,
            above_sibling:     NONE,
            x:                 rect.x as i16,
            y:                 rect.y as i16,
            width:             rect.width as u16,
            height:            rect.height as u16,
            border_width:      0,
            override_redirect: false,
        };

        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, &event)
            .context(format!("failed to send ConfigureNotify to Window({:#0x})", window))?;
        Ok(())
    }

    fn copy_shape(&self, frame: Window, window: Window) -> Result<()> {
        if !self.has_shape {
            return Ok(());
        }

        let shaped = self
            .conn
            .shape_query_extents(window)
            .context(format!("failed to query shape of Window({:#0x})", window))?
            .reply()
            .map_or(false, |reply| reply.bounding_shaped);

        if shaped {
            log::debug!("copying the shape of Window({:#0x})", window);
            self.conn
                .shape_combine(
                    shape::SO::SET,
                    shape::SK::BOUNDING,
                    shape::SK::BOUNDING,
                    frame,
                    0,
                    0,
                    window,
                )
                .context(format!("failed to shape Window({:#0x})", frame))?;
        } else {
            self.conn
                .shape_mask(shape::SO::SET, shape::SK::BOUNDING, frame, 0, 0, NONE)
                .context(format!("failed to reset the shape of Window({:#0x})", frame))?;
        }

        Ok(())
    }

    fn focus(&self, window: Window) -> Result<()> {
        log::debug!("focusing Window({:#0x})", window);
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)
            .context(format!("failed to `set_input_focus` for Window({:#0x})", window))?;
        Ok(())
    }

    fn focus_pointer_root(&self) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, POINTER_ROOT, CURRENT_TIME)
            .context("failed to return the focus to the pointer root")?;
        Ok(())
    }

    fn install_colormap(&self, colormap: Colormap) -> Result<()> {
        self.conn
            .install_colormap(colormap)
            .context(format!("failed to install Colormap({:#0x})", colormap))?;
        Ok(())
    }

    fn kill_client(&self, window: Window) -> Result<()> {
        log::debug!("killing the client of Window({:#0x})", window);
        self.conn
            .kill_client(window)
            .context(format!("failed to kill Window({:#0x})", window))?;
        Ok(())
    }

    fn send_delete(&self, window: Window) -> Result<()> {
        let data = [self.atoms.WM_DELETE_WINDOW, CURRENT_TIME, 0, 0, 0];
        let event = ClientMessageEvent::new(32, window, self.atoms.WM_PROTOCOLS, data);
        log::debug!("sending `WM_DELETE_WINDOW` to Window({:#0x})", window);

        self.conn
            .send_event(false, window, EventMask::NO_EVENT, &event)
            .context(format!("failed to send event. Window: {:#0x}", window))?;
        Ok(())
    }

    fn configure_unmanaged(&self, request: &ConfigureRequestData) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        if let Some(x) = request.x {
            aux = aux.x(x);
        }
        if let Some(y) = request.y {
            aux = aux.y(y);
        }
        if let Some(w) = request.width {
            aux = aux.width(w.max(1) as u32);
        }
        if let Some(h) = request.height {
            aux = aux.height(h.max(1) as u32);
        }
        if let Some(b) = request.border {
            aux = aux.border_width(b.max(0) as u32);
        }
        if let Some(mode) = request.stack_mode {
            if let Some(sibling) = request.sibling {
                aux = aux.sibling(sibling);
            }
            aux = aux.stack_mode(to_stack_mode(mode));
        }

        self.configure(request.window, &aux)
    }

    // ]]] === Requests ===

    // ========================= Grabs ========================= [[[

    fn grab_pointer(&self, root: Window, cursor: CursorKind) -> Result<bool> {
        let cursor = match cursor {
            CursorKind::Normal => NONE,
            CursorKind::Move => self.cursors.moving,
            CursorKind::Resize => self.cursors.resizing,
            CursorKind::None => self.cursors.blank,
        };

        let reply = self
            .conn
            .grab_pointer(
                false,
                root,
                pointer_grab_mask(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                cursor,
                CURRENT_TIME,
            )
            .context("failed to grab pointer")?
            .reply()
            .context("failed to get reply after grabbing pointer")?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn
            .ungrab_pointer(CURRENT_TIME)
            .context("failed to ungrab pointer")?;
        Ok(())
    }

    fn grab_keyboard(&self, root: Window) -> Result<bool> {
        let reply = self
            .conn
            .grab_keyboard(false, root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)
            .context("failed to grab keyboard")?
            .reply()
            .context("failed to get reply after grabbing keyboard")?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.conn
            .ungrab_keyboard(CURRENT_TIME)
            .context("failed to ungrab keyboard")?;
        Ok(())
    }

    fn grab_server(&self) -> Result<()> {
        self.conn.grab_server().context("failed to grab server")?;
        Ok(())
    }

    fn ungrab_server(&self) -> Result<()> {
        self.conn.ungrab_server().context("failed to ungrab server")?;
        Ok(())
    }

    fn grab_key(&self, window: Window, keycode: u8, modifiers: u16) -> Result<()> {
        self.conn
            .grab_key(true, window, modifiers, keycode, GrabMode::ASYNC, GrabMode::ASYNC)
            .context(format!("failed to grab key {}", keycode))?;
        Ok(())
    }

    fn ungrab_all_keys(&self, window: Window) -> Result<()> {
        self.conn
            .ungrab_key(ANY_KEY, window, ModMask::ANY)
            .context("failed to ungrab all keys")?;
        Ok(())
    }

    fn grab_button(&self, window: Window, button: u8, modifiers: u16) -> Result<()> {
        self.conn
            .grab_button(
                false,
                window,
                u32::from(EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE) as u16,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                ButtonIndex::from(button),
                modifiers,
            )
            .context(format!("failed to grab button {}", button))?;
        Ok(())
    }

    fn ungrab_button(&self, window: Window, button: u8, modifiers: u16) -> Result<()> {
        self.conn
            .ungrab_button(ButtonIndex::from(button), window, modifiers)
            .context(format!("failed to ungrab button {}", button))?;
        Ok(())
    }

    fn ungrab_all_buttons(&self, window: Window) -> Result<()> {
        self.conn
            .ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)
            .context("failed to ungrab all buttons")?;
        Ok(())
    }

    // ]]] === Grabs ===

    // ======================= Properties ====================== [[[

    fn set_wm_state(&self, window: Window, state: IcccmWindowState) -> Result<()> {
        self.conn
            .change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.WM_STATE,
                self.atoms.WM_STATE,
                &[u32::from(state), NONE],
            )
            .context(format!("failed to set `WM_STATE` on Window({:#0x})", window))?;
        Ok(())
    }

    fn set_net_wm_state(&self, window: Window, states: &[NetWmState]) -> Result<()> {
        let atoms = states
            .iter()
            .map(|&s| self.atoms.net_wm_state(s))
            .collect::<Vec<_>>();
        self.set_atoms(window, self.atoms._NET_WM_STATE, &atoms)
    }

    fn set_allowed_actions(&self, window: Window, actions: &[AllowedAction]) -> Result<()> {
        let atoms = actions
            .iter()
            .map(|&a| self.atoms.allowed_action(a))
            .collect::<Vec<_>>();
        self.set_atoms(window, self.atoms._NET_WM_ALLOWED_ACTIONS, &atoms)
    }

    fn delete_allowed_actions(&self, window: Window) -> Result<()> {
        self.delete_property(window, self.atoms._NET_WM_ALLOWED_ACTIONS)
    }

    fn set_frame_extents(&self, window: Window, border: i32) -> Result<()> {
        let b = border.max(0) as u32;
        self.set_cardinals(window, self.atoms._NET_FRAME_EXTENTS, &[b, b, b, b])
    }

    fn set_wm_desktop(&self, window: Window, desktop: u32) -> Result<()> {
        self.set_cardinals(window, self.atoms._NET_WM_DESKTOP, &[desktop])
    }

    fn set_unmaximised(&self, window: Window, axis: Axis, saved: Option<(i32, i32)>) -> Result<()> {
        let atom = self.atoms.unmaximised(axis);
        match saved {
            Some((pos, size)) => self.set_cardinals(window, atom, &[pos as u32, size as u32]),
            None => self.delete_property(window, atom),
        }
    }

    fn delete_client_hints(&self, window: Window) -> Result<()> {
        self.delete_property(window, self.atoms._NET_WM_DESKTOP)?;
        self.delete_property(window, self.atoms._NET_WM_STATE)
    }

    fn set_client_list(&self, root: Window, windows: &[Window]) -> Result<()> {
        self.set_windows(root, self.atoms._NET_CLIENT_LIST, windows)
    }

    fn set_client_list_stacking(&self, root: Window, windows: &[Window]) -> Result<()> {
        self.set_windows(root, self.atoms._NET_CLIENT_LIST_STACKING, windows)
    }

    fn set_active_window(&self, root: Window, window: Option<Window>) -> Result<()> {
        self.set_windows(root, self.atoms._NET_ACTIVE_WINDOW, &[window.unwrap_or(NONE)])
    }

    fn set_number_of_desktops(&self, root: Window, count: u32) -> Result<()> {
        self.set_cardinals(root, self.atoms._NET_NUMBER_OF_DESKTOPS, &[count])
    }

    fn set_current_desktop(&self, root: Window, desktop: u32) -> Result<()> {
        self.set_cardinals(root, self.atoms._NET_CURRENT_DESKTOP, &[desktop])
    }

    fn set_desktop_geometry(&self, root: Window, width: i32, height: i32) -> Result<()> {
        let (w, h) = (width.max(0) as u32, height.max(0) as u32);
        self.set_cardinals(root, self.atoms._NET_DESKTOP_GEOMETRY, &[w, h])?;
        self.set_cardinals(root, self.atoms._NET_DESKTOP_VIEWPORT, &[0, 0])?;
        self.set_cardinals(root, self.atoms._NET_WORKAREA, &[0, 0, w, h])
    }

    fn set_supported(&self, root: Window) -> Result<()> {
        self.set_atoms(root, self.atoms._NET_SUPPORTED, &self.atoms.supported())
    }

    fn set_supporting_wm_check(&self, root: Window, check: Window) -> Result<()> {
        self.set_windows(root, self.atoms._NET_SUPPORTING_WM_CHECK, &[check])?;
        self.set_windows(check, self.atoms._NET_SUPPORTING_WM_CHECK, &[check])?;
        self.conn
            .change_property8(
                PropMode::REPLACE,
                check,
                self.atoms._NET_WM_NAME,
                self.atoms.UTF8_STRING,
                WM_NAME.as_bytes(),
            )
            .context("failed to set `_NET_WM_NAME` on the supporting window")?;
        self.set_cardinals(check, self.atoms._NET_WM_PID, &[std::process::id()])
    }

    fn clear_root_hints(&self, root: Window) -> Result<()> {
        for atom in self.atoms.root_hints() {
            self.delete_property(root, atom)?;
        }
        Ok(())
    }

    // ]]] === Properties ===

    // ======================== Drawing ======================== [[[

    fn draw_outline(&self, root: Window, rect: Rectangle, border: i32, label: &str) -> Result<()> {
        let res = self.root(root)?;
        log::trace!("outline on Window({:#0x}): Rectangle({})", root, rect);

        // Along the middle of the border
        let half = border / 2;
        let outer = xproto::Rectangle {
            x:      (rect.x - border + half) as i16,
            y:      (rect.y - border + half) as i16,
            width:  (rect.width + border) as u16,
            height: (rect.height + border) as u16,
        };
        self.conn
            .poly_rectangle(root, res.xor_gc, &[outer])
            .context("failed to draw outline")?;

        if !label.is_empty() {
            let x = rect.x + rect.width - self.font.text_width(label) - 2;
            let y = rect.y + rect.height - self.font.descent - 2;
            self.conn
                .poly_text8(root, res.xor_gc, x as i16, y as i16, &text_item(label))
                .context("failed to draw outline label")?;
        }

        Ok(())
    }

    fn text_width(&self, text: &str) -> i32 {
        self.font.text_width(text)
    }

    fn font_metrics(&self) -> (i32, i32) {
        (self.font.ascent, self.font.descent)
    }

    fn show_info(&self, root: Window, rect: Rectangle, lines: &[String], pixel: u32) -> Result<Window> {
        let res = self.root(root)?;
        let wid = self.conn.generate_id().context("failed to generate an ID")?;
        log::debug!("creating info Window({:#0x}): Rectangle({})", wid, rect);

        let aux = CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(res.white)
            .border_pixel(pixel);
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                wid,
                root,
                rect.x as i16,
                rect.y as i16,
                rect.width.max(1) as u16,
                rect.height.max(1) as u16,
                1,
                xproto::WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &aux,
            )
            .context(format!("failed to create Window({:#0x})", wid))?;
        self.map(wid)?;
        self.raise(wid)?;

        // Drawing before the map completes would be lost
        self.sync();

        let line_height = self.font.ascent + self.font.descent;
        for (i, line) in lines.iter().enumerate() {
            let y = self.font.ascent + i as i32 * line_height;
            let bytes = line.as_bytes();
            self.conn
                .image_text8(wid, res.text_gc, 1, y as i16, &bytes[..bytes.len().min(255)])
                .context("failed to draw info text")?;
        }

        Ok(wid)
    }

    // ]]] === Drawing ===
}

// ]]] === XConnection ===

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ff8000"), Some((0xffff, 0x8080, 0)));
        assert_eq!(parse_hex_color("#f80"), Some((0xffff, 0x8888, 0)));
        assert_eq!(parse_hex_color("goldenrod"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn text_items_are_length_prefixed() {
        assert_eq!(text_item("ab"), vec![2, 0, b'a', b'b']);
        assert_eq!(text_item(&"x".repeat(300)).len(), 256);
    }

    #[test]
    fn keymap_lookups() {
        let keymap = Keymap {
            min_keycode: 8,
            per_code:    2,
            keysyms:     vec![0x61, 0x41, 0xff09, 0xfe20, 0x62, 0x42, 0xff09, 0],
        };

        assert_eq!(keymap.keycodes(0xff09), vec![9, 11]);
        assert_eq!(keymap.keycodes(0x42), vec![10]);
        assert!(keymap.keycodes(0x63).is_empty());
        assert_eq!(keymap.keysym(8), 0x61);
        assert_eq!(keymap.keysym(9), 0xff09);
        assert_eq!(keymap.keysym(99), 0);
    }
}
