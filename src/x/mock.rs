//! A fake display used by unit tests. Windows, their properties and the
//! pointer are plain maps; every request is recorded as a line of text.

use super::{
    event::{ConfigureRequestData, XEvent},
    input::Keysym,
    property::{AllowedAction, Axis, IcccmWindowState, MotifHints, NetWmState, WindowType, WmSizeHints},
    Colormap, CursorKind, Pointer, ScreenInfo, Window, WindowAttributes, XConn,
};
use crate::{
    geometry::{Point, Rectangle},
    screen::Monitor,
};
use anyhow::{anyhow, Result};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};

/// First id handed out by [`MockXConn::create_frame`]
pub(crate) const FIRST_FRAME: Window = 0x100;
pub(crate) const ROOT: Window = 0x1;

#[derive(Debug, Default)]
pub(crate) struct MockWindow {
    pub(crate) attrs:    WindowAttributes,
    pub(crate) name:     Option<String>,
    pub(crate) class:    Option<(String, String)>,
    pub(crate) types:    WindowType,
    pub(crate) desktop:  Option<u32>,
    pub(crate) hints:    Option<WmSizeHints>,
    pub(crate) motif:    Option<MotifHints>,
    pub(crate) delete:   bool,
    pub(crate) horz:     Option<(i32, i32)>,
    pub(crate) vert:     Option<(i32, i32)>,
    pub(crate) states:   Vec<NetWmState>,
    pub(crate) wm_state: Option<IcccmWindowState>,
}

#[derive(Debug)]
pub(crate) struct MockXConn {
    pub(crate) screens:  Vec<ScreenInfo>,
    pub(crate) monitors: Vec<Monitor>,
    pub(crate) windows:  RefCell<HashMap<Window, MockWindow>>,
    pub(crate) events:   RefCell<VecDeque<XEvent>>,
    pub(crate) pointer:  Cell<Point>,
    pub(crate) keymap:   HashMap<Keysym, u8>,
    pub(crate) requests: RefCell<Vec<String>>,
    /// Root properties: client list, stacking list, active window, desktop
    pub(crate) clients:  RefCell<Vec<Window>>,
    pub(crate) stacking: RefCell<Vec<Window>>,
    pub(crate) active:   Cell<Option<Window>>,
    pub(crate) desktop:  Cell<u32>,
    /// Requests starting with this prefix are recorded, then fail
    pub(crate) fail_on:  RefCell<Option<String>>,
    next_id:             Cell<Window>,
}

impl MockXConn {
    /// One screen of `width` x `height` with a single monitor covering it
    pub(crate) fn new(width: i32, height: i32) -> Self {
        let mut keymap = HashMap::new();
        // Printable ASCII and the common function keys, one keycode each
        for (i, sym) in (0x20..0x7f_u32).chain(0xff08..0xffa0).enumerate() {
            keymap.insert(sym, (8 + i) as u8);
        }

        Self {
            screens: vec![ScreenInfo { root: ROOT, width, height, colormap: 0x20 }],
            monitors: vec![Monitor::new(Rectangle::new(0, 0, width, height), None)],
            windows: RefCell::new(HashMap::new()),
            events: RefCell::new(VecDeque::new()),
            pointer: Cell::new(Point::new(0, 0)),
            keymap,
            requests: RefCell::new(Vec::new()),
            clients: RefCell::new(Vec::new()),
            stacking: RefCell::new(Vec::new()),
            active: Cell::new(None),
            desktop: Cell::new(0),
            fail_on: RefCell::new(None),
            next_id: Cell::new(FIRST_FRAME),
        }
    }

    /// Add a top-level client window
    pub(crate) fn add_window(&self, window: Window, rect: Rectangle, name: &str) {
        self.windows.borrow_mut().insert(window, MockWindow {
            attrs: WindowAttributes { root: ROOT, rect, border: 1, ..WindowAttributes::default() },
            name: Some(name.to_owned()),
            ..MockWindow::default()
        });
    }

    /// Modify a window added with [`add_window`](Self::add_window)
    pub(crate) fn with_window(&self, window: Window, f: impl FnOnce(&mut MockWindow)) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&window) {
            f(w);
        }
    }

    pub(crate) fn push_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub(crate) fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    /// Whether a request starting with `prefix` was made
    pub(crate) fn sent(&self, prefix: &str) -> bool {
        self.requests.borrow().iter().any(|r| r.starts_with(prefix))
    }

    pub(crate) fn states(&self, window: Window) -> Vec<NetWmState> {
        self.windows.borrow().get(&window).map(|w| w.states.clone()).unwrap_or_default()
    }

    pub(crate) fn wm_state(&self, window: Window) -> Option<IcccmWindowState> {
        self.windows.borrow().get(&window).and_then(|w| w.wm_state)
    }

    /// `_NET_WM_DESKTOP` of a window
    pub(crate) fn desktop_of(&self, window: Window) -> Option<u32> {
        self.windows.borrow().get(&window).and_then(|w| w.desktop)
    }

    /// Make every later request starting with `prefix` fail
    pub(crate) fn fail_requests(&self, prefix: &str) {
        *self.fail_on.borrow_mut() = Some(prefix.to_owned());
    }

    fn record(&self, request: String) -> Result<()> {
        let fails = self.fail_on.borrow().as_deref().map_or(false, |p| request.starts_with(p));
        self.requests.borrow_mut().push(request);
        if fails {
            return Err(anyhow!("request failed"));
        }
        Ok(())
    }
}

impl XConn for MockXConn {
    fn screens(&self) -> Vec<ScreenInfo> {
        self.screens.clone()
    }

    fn monitors(&self, _root: Window) -> Result<Vec<Monitor>> {
        Ok(self.monitors.clone())
    }

    fn become_wm(&self, root: Window, _screen: usize) -> Result<()> {
        self.record(format!("become_wm {:#x}", root))
    }

    fn alloc_color(&self, _colormap: Colormap, name: &str) -> Result<u32> {
        Ok(match name {
            "goldenrod" => 0xdaa520,
            "grey50" => 0x7f7f7f,
            "blue" => 0x0000ff,
            _ => 0xffffff,
        })
    }

    fn create_supporting_window(&self, _root: Window) -> Result<Window> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(id)
    }

    fn query_tree(&self, _root: Window) -> Result<Vec<Window>> {
        let mut ids = self.windows.borrow().keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        Ok(ids)
    }

    fn numlock_mask(&self) -> Result<u16> {
        Ok(1 << 4)
    }

    fn refresh_keymap(&mut self) -> Result<()> {
        self.record("refresh_keymap".to_owned())
    }

    fn keysym_to_keycodes(&self, sym: Keysym) -> Vec<u8> {
        self.keymap.get(&sym).copied().into_iter().collect()
    }

    fn keycode_to_keysym(&self, code: u8) -> Keysym {
        self.keymap.iter().find(|(_, &c)| c == code).map_or(0, |(&s, _)| s)
    }

    fn next_event(&self) -> Result<Option<XEvent>> {
        match self.events.borrow_mut().pop_front() {
            Some(event) => Ok(Some(event)),
            None => Err(anyhow!("no more events")),
        }
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        Ok(self.events.borrow_mut().pop_front())
    }

    fn flush(&self) -> bool {
        true
    }

    fn sync(&self) {}

    fn window_attributes(&self, window: Window) -> Result<WindowAttributes> {
        self.windows
            .borrow()
            .get(&window)
            .map(|w| w.attrs)
            .ok_or_else(|| anyhow!("no window {:#x}", window))
    }

    fn window_name(&self, window: Window) -> Option<String> {
        self.windows.borrow().get(&window).and_then(|w| w.name.clone())
    }

    fn window_class(&self, window: Window) -> Option<(String, String)> {
        self.windows.borrow().get(&window).and_then(|w| w.class.clone())
    }

    fn window_types(&self, window: Window) -> WindowType {
        self.windows.borrow().get(&window).map(|w| w.types).unwrap_or_default()
    }

    fn window_desktop(&self, window: Window) -> Option<u32> {
        self.windows.borrow().get(&window).and_then(|w| w.desktop)
    }

    fn unmaximised(&self, window: Window, axis: Axis) -> Option<(i32, i32)> {
        self.windows.borrow().get(&window).and_then(|w| match axis {
            Axis::Horizontal => w.horz,
            Axis::Vertical => w.vert,
        })
    }

    fn size_hints(&self, window: Window) -> Option<WmSizeHints> {
        self.windows.borrow().get(&window).and_then(|w| w.hints)
    }

    fn motif_hints(&self, window: Window) -> Option<MotifHints> {
        self.windows.borrow().get(&window).and_then(|w| w.motif)
    }

    fn supports_delete(&self, window: Window) -> bool {
        self.windows.borrow().get(&window).map_or(false, |w| w.delete)
    }

    fn query_pointer(&self, _window: Window) -> Result<Pointer> {
        Ok(Pointer { root: ROOT, pos: self.pointer.get(), child: None })
    }

    fn select_client_input(&self, window: Window) -> Result<()> {
        self.record(format!("select_input {:#x}", window))
    }

    fn create_frame(&self, _root: Window, rect: Rectangle, border: i32, _pixel: u32) -> Result<Window> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.record(format!(
            "create_frame {:#x} {} {} {} {} {}",
            id, rect.x, rect.y, rect.width, rect.height, border
        ))?;
        Ok(id)
    }

    fn reparent(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.record(format!("reparent {:#x} {:#x} {} {}", window, parent, x, y))
    }

    fn add_to_save_set(&self, window: Window) -> Result<()> {
        self.record(format!("save_set_add {:#x}", window))
    }

    fn remove_from_save_set(&self, window: Window) -> Result<()> {
        self.record(format!("save_set_remove {:#x}", window))
    }

    fn set_border_width(&self, window: Window, width: i32) -> Result<()> {
        self.record(format!("border_width {:#x} {}", window, width))
    }

    fn set_border_color(&self, window: Window, pixel: u32) -> Result<()> {
        self.record(format!("border_color {:#x} {:#x}", window, pixel))
    }

    fn map(&self, window: Window) -> Result<()> {
        self.record(format!("map {:#x}", window))
    }

    fn unmap(&self, window: Window) -> Result<()> {
        self.record(format!("unmap {:#x}", window))
    }

    fn destroy(&self, window: Window) -> Result<()> {
        self.record(format!("destroy {:#x}", window))
    }

    fn move_window(&self, window: Window, x: i32, y: i32) -> Result<()> {
        self.record(format!("move {:#x} {} {}", window, x, y))
    }

    fn move_resize(&self, window: Window, rect: Rectangle) -> Result<()> {
        self.record(format!(
            "move_resize {:#x} {} {} {} {}",
            window, rect.x, rect.y, rect.width, rect.height
        ))
    }

    fn configure_frame(&self, window: Window, rect: Rectangle, border: i32) -> Result<()> {
        self.record(format!(
            "configure_frame {:#x} {} {} {} {} {}",
            window, rect.x, rect.y, rect.width, rect.height, border
        ))
    }

    fn raise(&self, window: Window) -> Result<()> {
        self.record(format!("raise {:#x}", window))
    }

    fn lower(&self, window: Window) -> Result<()> {
        self.record(format!("lower {:#x}", window))
    }

    fn place_below(&self, window: Window, sibling: Window) -> Result<()> {
        self.record(format!("place_below {:#x} {:#x}", window, sibling))
    }

    fn send_configure_notify(&self, window: Window, rect: Rectangle) -> Result<()> {
        self.record(format!(
            "configure_notify {:#x} {} {} {} {}",
            window, rect.x, rect.y, rect.width, rect.height
        ))
    }

    fn copy_shape(&self, frame: Window, window: Window) -> Result<()> {
        self.record(format!("copy_shape {:#x} {:#x}", frame, window))
    }

    fn focus(&self, window: Window) -> Result<()> {
        self.record(format!("focus {:#x}", window))
    }

    fn focus_pointer_root(&self) -> Result<()> {
        self.record("focus_pointer_root".to_owned())
    }

    fn install_colormap(&self, colormap: Colormap) -> Result<()> {
        self.record(format!("install_colormap {:#x}", colormap))
    }

    fn kill_client(&self, window: Window) -> Result<()> {
        self.record(format!("kill {:#x}", window))
    }

    fn send_delete(&self, window: Window) -> Result<()> {
        self.record(format!("delete {:#x}", window))
    }

    fn configure_unmanaged(&self, request: &ConfigureRequestData) -> Result<()> {
        self.record(format!("configure_unmanaged {:#x}", request.window))
    }

    fn grab_pointer(&self, _root: Window, cursor: CursorKind) -> Result<bool> {
        self.record(format!("grab_pointer {:?}", cursor))?;
        Ok(true)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.record("ungrab_pointer".to_owned())
    }

    fn grab_keyboard(&self, _root: Window) -> Result<bool> {
        self.record("grab_keyboard".to_owned())?;
        Ok(true)
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.record("ungrab_keyboard".to_owned())
    }

    fn grab_server(&self) -> Result<()> {
        self.record("grab_server".to_owned())
    }

    fn ungrab_server(&self) -> Result<()> {
        self.record("ungrab_server".to_owned())
    }

    fn grab_key(&self, window: Window, keycode: u8, modifiers: u16) -> Result<()> {
        self.record(format!("grab_key {:#x} {} {:#x}", window, keycode, modifiers))
    }

    fn ungrab_all_keys(&self, window: Window) -> Result<()> {
        self.record(format!("ungrab_all_keys {:#x}", window))
    }

    fn grab_button(&self, window: Window, button: u8, modifiers: u16) -> Result<()> {
        self.record(format!("grab_button {:#x} {} {:#x}", window, button, modifiers))
    }

    fn ungrab_button(&self, window: Window, button: u8, modifiers: u16) -> Result<()> {
        self.record(format!("ungrab_button {:#x} {} {:#x}", window, button, modifiers))
    }

    fn ungrab_all_buttons(&self, window: Window) -> Result<()> {
        self.record(format!("ungrab_all_buttons {:#x}", window))
    }

    fn set_wm_state(&self, window: Window, state: IcccmWindowState) -> Result<()> {
        self.with_window(window, |w| w.wm_state = Some(state));
        self.record(format!("wm_state {:#x} {:?}", window, state))
    }

    fn set_net_wm_state(&self, window: Window, states: &[NetWmState]) -> Result<()> {
        self.with_window(window, |w| w.states = states.to_vec());
        self.record(format!("net_wm_state {:#x} {:?}", window, states))
    }

    fn set_allowed_actions(&self, window: Window, actions: &[AllowedAction]) -> Result<()> {
        self.record(format!("allowed_actions {:#x} {:?}", window, actions))
    }

    fn delete_allowed_actions(&self, window: Window) -> Result<()> {
        self.record(format!("delete_allowed_actions {:#x}", window))
    }

    fn set_frame_extents(&self, window: Window, border: i32) -> Result<()> {
        self.record(format!("frame_extents {:#x} {}", window, border))
    }

    fn set_wm_desktop(&self, window: Window, desktop: u32) -> Result<()> {
        self.with_window(window, |w| w.desktop = Some(desktop));
        self.record(format!("wm_desktop {:#x} {}", window, desktop))
    }

    fn set_unmaximised(&self, window: Window, axis: Axis, saved: Option<(i32, i32)>) -> Result<()> {
        self.with_window(window, |w| match axis {
            Axis::Horizontal => w.horz = saved,
            Axis::Vertical => w.vert = saved,
        });
        self.record(format!("unmaximised {:#x} {:?} {:?}", window, axis, saved))
    }

    fn delete_client_hints(&self, window: Window) -> Result<()> {
        self.with_window(window, |w| {
            w.desktop = None;
            w.states.clear();
        });
        self.record(format!("delete_client_hints {:#x}", window))
    }

    fn set_client_list(&self, _root: Window, windows: &[Window]) -> Result<()> {
        *self.clients.borrow_mut() = windows.to_vec();
        Ok(())
    }

    fn set_client_list_stacking(&self, _root: Window, windows: &[Window]) -> Result<()> {
        *self.stacking.borrow_mut() = windows.to_vec();
        Ok(())
    }

    fn set_active_window(&self, _root: Window, window: Option<Window>) -> Result<()> {
        self.active.set(window);
        self.record(format!("active_window {:?}", window))
    }

    fn set_number_of_desktops(&self, _root: Window, count: u32) -> Result<()> {
        self.record(format!("number_of_desktops {}", count))
    }

    fn set_current_desktop(&self, _root: Window, desktop: u32) -> Result<()> {
        self.desktop.set(desktop);
        self.record(format!("current_desktop {}", desktop))
    }

    fn set_desktop_geometry(&self, _root: Window, width: i32, height: i32) -> Result<()> {
        self.record(format!("desktop_geometry {} {}", width, height))
    }

    fn set_supported(&self, _root: Window) -> Result<()> {
        self.record("supported".to_owned())
    }

    fn set_supporting_wm_check(&self, _root: Window, check: Window) -> Result<()> {
        self.record(format!("supporting_wm_check {:#x}", check))
    }

    fn clear_root_hints(&self, _root: Window) -> Result<()> {
        self.record("clear_root_hints".to_owned())
    }

    fn draw_outline(&self, _root: Window, rect: Rectangle, border: i32, label: &str) -> Result<()> {
        self.record(format!(
            "outline {} {} {} {} {} {}",
            rect.x, rect.y, rect.width, rect.height, border, label
        ))
    }

    fn text_width(&self, text: &str) -> i32 {
        6 * text.chars().count() as i32
    }

    fn font_metrics(&self) -> (i32, i32) {
        (10, 3)
    }

    fn show_info(&self, _root: Window, rect: Rectangle, lines: &[String], _pixel: u32) -> Result<Window> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.record(format!(
            "info {:#x} {} {} {} {} {}",
            id,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            lines.join("|")
        ))?;
        Ok(id)
    }
}
