//! The event loop.
//!
//! Outside of an interactive operation each event goes to its handler. While
//! a client is dragged or swept, focus is cycled or the info banner is up,
//! [`Mode`] says what is going on and the events that operation does not
//! consume wait in a queue until it ends.

use crate::{
    bind::BindFlags,
    client::{ClientId, Vdesk},
    geometry::{bound, Gravity, Point, Rectangle},
    manager::WindowManager,
    placement::{self, MaximiseAction, SnapTarget},
    x::{
        event::{
            ConfigureRequestData,
            MotionEvent,
            NetMessage,
            PropertyKind,
            StackMode,
            XError,
            XErrorKind,
            XEvent,
            SOURCE_PAGER,
        },
        property::{default_constraints, Axis, NetWmState, WindowType},
        Window,
        XConn,
    },
};
use anyhow::Result;
use std::{
    mem,
    sync::atomic::{AtomicBool, Ordering},
};

// ================================ Modes ================================= [[[

/// An inverted rectangle drawn on the root while the server is grabbed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Outline {
    pub(crate) root:   Window,
    pub(crate) rect:   Rectangle,
    pub(crate) border: i32,
    /// Geometry in size increments, drawn alongside
    pub(crate) label:  String,
}

/// A client following the pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Drag {
    pub(crate) client:  ClientId,
    /// Button whose release ends the drag
    pub(crate) button:  u8,
    /// Client position when the drag started
    pub(crate) origin:  Point,
    /// Pointer position when the drag started
    pub(crate) start:   Point,
    /// Monitor the client was on, for snapping
    pub(crate) monitor: Rectangle,
    /// `None` when dragging solid
    pub(crate) outline: Option<Outline>,
}

/// A client being resized from a fixed corner to the pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sweep {
    pub(crate) client:  ClientId,
    pub(crate) button:  u8,
    pub(crate) anchor:  Point,
    pub(crate) monitor: Rectangle,
    pub(crate) outline: Option<Outline>,
}

/// What ends an info banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InfoTrigger {
    /// Release of this keycode
    Key(u8),
    /// Release of this button
    Button(u8),
}

/// The interactive operation in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mode {
    Idle,
    Dragging(Drag),
    Sweeping(Sweep),
    /// Focus cycling; `keycode` steps to the next client
    Cycling {
        keycode: u8,
    },
    Info {
        trigger: InfoTrigger,
        banner:  Option<Window>,
    },
}

impl Default for Mode {
    fn default() -> Self {
        Self::Idle
    }
}

/// Why the event loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    Quit,
    /// Re-read the configuration and carry on
    Reload,
}

// ]]] === Modes ===

// ================================= Loop ================================= [[[

impl<X: XConn> WindowManager<X> {
    /// Handle events until `quit` is raised, or `reload` while nothing
    /// interactive is going on
    pub(crate) fn run(&mut self, quit: &AtomicBool, reload: &AtomicBool) -> Result<Exit> {
        log::info!("entering the event loop");
        loop {
            if quit.load(Ordering::SeqCst) {
                return Ok(Exit::Quit);
            }
            if self.mode == Mode::Idle && reload.swap(false, Ordering::SeqCst) {
                return Ok(Exit::Reload);
            }
            self.step()?;
        }
    }

    /// Handle a single event, waiting for one if none is queued
    pub(crate) fn step(&mut self) -> Result<()> {
        let event = match self.pending.pop_front() {
            Some(event) => event,
            None => match self.conn.next_event()? {
                Some(event) => event,
                None => return Ok(()),
            },
        };

        if let Err(e) = self.handle_event(event) {
            log::error!("{:#}", e);
        }

        if self.need_tidy && self.mode == Mode::Idle {
            self.tidy();
        }
        self.conn.flush();
        Ok(())
    }

    /// An event already received, if any
    fn next_queued(&mut self) -> Result<Option<XEvent>> {
        match self.pending.pop_front() {
            Some(event) => Ok(Some(event)),
            None => self.conn.poll_event(),
        }
    }

    /// Remove every client marked for removal. A failed request only costs
    /// the client it was made for.
    pub(crate) fn tidy(&mut self) {
        self.need_tidy = false;
        let marked = self
            .clients
            .iter()
            .filter(|(_, c)| c.remove)
            .map(|(id, c)| (id, c.window))
            .collect::<Vec<_>>();

        for (id, window) in marked {
            if let Err(e) = self.remove(id) {
                log::error!("failed to withdraw Window({:#0x}): {:#}", window, e);
            }
        }
    }

    pub(crate) fn handle_event(&mut self, event: XEvent) -> Result<()> {
        if let XEvent::Error(err) = event {
            self.handle_error(err);
            return Ok(());
        }
        if self.mode != Mode::Idle {
            return self.handle_modal(event);
        }

        if !event.preserves_guards() {
            self.initialising = None;
            self.removing = None;
        }

        match event {
            XEvent::KeyPress(e) => self.handle_key_press(e),
            XEvent::ButtonPress(e) => self.handle_button_press(e),
            XEvent::ConfigureRequest(req) => self.handle_configure_request(&req),
            XEvent::MapRequest(window) => self.handle_map_request(window),
            XEvent::UnmapNotify { window, .. } => {
                self.handle_unmap(window);
                Ok(())
            },
            XEvent::EnterNotify(window) => self.handle_enter(window),
            XEvent::ColormapNotify { window, colormap, new } => {
                match self.clients.find(window).and_then(|id| self.clients.get_mut(id)) {
                    Some(c) if new => {
                        c.colormap = colormap;
                        self.conn.install_colormap(colormap)
                    },
                    _ => Ok(()),
                }
            },
            XEvent::PropertyNotify { window, kind } => self.handle_property(window, kind),
            XEvent::ClientMessage { window, message } => self.handle_client_message(window, message),
            XEvent::MappingNotify { keyboard } if keyboard => self.keyboard_mapping_changed(),
            XEvent::ShapeNotify(window) => match self.clients.find(window).and_then(|id| self.clients.get(id)) {
                Some(c) if c.window == window => self.conn.copy_shape(c.parent, window),
                _ => Ok(()),
            },
            XEvent::ScreenChange { root, width, height } => self.handle_screen_change(root, width, height),
            _ => Ok(()),
        }
    }
}

// ]]] === Loop ===

// =============================== Handlers =============================== [[[

impl<X: XConn> WindowManager<X> {
    fn handle_configure_request(&mut self, req: &ConfigureRequestData) -> Result<()> {
        match self.clients.find(req.window) {
            Some(id) if self.clients.get(id).map_or(false, |c| c.manual) => {
                log::debug!("ignoring configure request of manual Window({:#0x})", req.window);
                Ok(())
            },
            Some(id) => self.apply_window_changes(id, req, 0),
            None => self.conn.configure_unmanaged(req),
        }
    }

    /// A request to map shows a known client, switching to its desktop if
    /// needed; anything else is managed
    fn handle_map_request(&mut self, window: Window) -> Result<()> {
        if let Some(id) = self.clients.find(window) {
            let Some(c) = self.clients.get(id) else {
                return Ok(());
            };
            let (screen, vdesk) = (c.screen, c.vdesk);
            if !self.is_visible(id) {
                self.switch_vdesk(screen, vdesk)?;
            }
            self.show(id)?;
            return self.raise(id);
        }

        let attrs = match self.conn.window_attributes(window) {
            Ok(attrs) => attrs,
            Err(e) => {
                log::debug!("map request from vanished Window({:#0x}): {}", window, e);
                return Ok(());
            },
        };
        match self.screen_of_root(attrs.root) {
            Some(screen) => self.manage(window, screen).map(drop),
            None => Ok(()),
        }
    }

    fn handle_unmap(&mut self, window: Window) {
        let Some(c) = self.clients.find(window).and_then(|id| self.clients.get_mut(id)) else {
            return;
        };

        if c.ignore_unmap > 0 {
            c.ignore_unmap -= 1;
            log::trace!("ignored unmap, {} left for Window({:#0x})", c.ignore_unmap, window);
        } else {
            log::debug!("Window({:#0x}) unmapped, flagging for removal", window);
            c.remove = true;
            self.need_tidy = true;
        }
    }

    /// Focus follows the pointer into visible clients
    fn handle_enter(&mut self, window: Window) -> Result<()> {
        let Some(id) = self.clients.find(window) else {
            return Ok(());
        };
        if !self.is_visible(id) {
            return Ok(());
        }
        self.select(Some(id))?;
        self.clients.touch(id);
        Ok(())
    }

    fn handle_property(&mut self, window: Window, kind: PropertyKind) -> Result<()> {
        let Some(id) = self.clients.find(window) else {
            return Ok(());
        };

        match kind {
            PropertyKind::NormalHints => {
                let hints = self.conn.size_hints(window);
                let (constraints, gravity) = hints.map_or_else(default_constraints, |h| h.constraints());
                if let Some(c) = self.clients.get_mut(id) {
                    c.hints = constraints;
                    c.gravity_hint = gravity;
                    c.gravity = gravity;
                    log::debug!("new size hints for Window({:#0x}): {}", window, c.rect);
                }
                self.reclamp(id)?;
                self.set_allowed_actions(id)
            },
            PropertyKind::WindowType => {
                let types = self.conn.window_types(window);
                if let Some(c) = self.clients.get_mut(id) {
                    c.is_dock = types.contains(WindowType::DOCK);
                }
                if self.is_visible(id) {
                    self.show(id)
                } else {
                    self.update_net_wm_state(id)
                }
            },
            PropertyKind::Other => Ok(()),
        }
    }

    fn handle_screen_change(&mut self, root: Window, width: i32, height: i32) -> Result<()> {
        let Some(screen) = self.screen_of_root(root) else {
            return Ok(());
        };
        log::info!("screen {} is now {}x{}", screen, width, height);

        self.note_client_monitors(screen);
        let s = &mut self.screens[screen];
        let old = (s.width, s.height);
        s.width = width;
        s.height = height;

        let monitors = self.conn.monitors(root)?;
        self.screens[screen].set_monitors(monitors);
        self.fix_screen_after_resize(screen, old)?;
        self.publish_desktop_geometry(screen)
    }

    /// Messages from pagers and clients. Most are only honoured when they
    /// come from direct user action.
    fn handle_client_message(&mut self, window: Window, message: NetMessage) -> Result<()> {
        if let NetMessage::CurrentDesktop(desktop) = message {
            if let Some(screen) = self.pointer_screen()? {
                self.switch_vdesk(screen, Vdesk::from_cardinal(desktop))?;
            }
            return Ok(());
        }

        let Some(id) = self.clients.find(window) else {
            if message == NetMessage::RequestFrameExtents {
                let border = if self.conn.motif_hints(window).map_or(false, |m| m.disables_border()) {
                    0
                } else {
                    self.settings.border_width
                };
                return self.conn.set_frame_extents(window, border);
            }
            log::debug!("discarding {:?} for unmanaged Window({:#0x})", message, window);
            return Ok(());
        };

        match message {
            NetMessage::ActiveWindow { source } if source == SOURCE_PAGER => {
                let here = self.pointer_screen()?;
                if self.clients.get(id).map(|c| c.screen) == here {
                    self.select(Some(id))?;
                }
                Ok(())
            },
            NetMessage::CloseWindow { source } if source == SOURCE_PAGER =>
                self.func_delete(id, BindFlags::empty()),
            NetMessage::MoveResizeWindow { flags, x, y, width, height }
                if NetMessage::moveresize_source(flags) == SOURCE_PAGER =>
            {
                let req = ConfigureRequestData::from_moveresize(window, [flags, x, y, width, height]);
                self.apply_window_changes(id, &req, NetMessage::moveresize_gravity(flags))
            },
            NetMessage::RestackWindow { source, sibling, detail } if source == SOURCE_PAGER => {
                let req = ConfigureRequestData {
                    window,
                    sibling: (sibling != 0).then_some(sibling),
                    stack_mode: StackMode::from_detail(detail),
                    ..ConfigureRequestData::default()
                };
                self.apply_window_changes(id, &req, 0)
            },
            NetMessage::WmDesktop { desktop, source } if source == SOURCE_PAGER =>
                self.client_to_vdesk(id, Vdesk::from_cardinal(desktop)),
            NetMessage::WmState { action, first, second } => {
                if self.clients.get(id).map_or(true, |c| c.manual) {
                    log::debug!("ignoring state change of manual Window({:#0x})", window);
                    return Ok(());
                }

                let (mut horz, mut vert) = (false, false);
                for state in [first, second].into_iter().flatten() {
                    match state {
                        NetWmState::MaximizedHorz => horz = true,
                        NetWmState::MaximizedVert => vert = true,
                        NetWmState::Fullscreen => (horz, vert) = (true, true),
                        _ => {},
                    }
                }

                match MaximiseAction::from_net(action) {
                    Some(action) if horz || vert => self.maximise(id, action, horz, vert),
                    _ => Ok(()),
                }
            },
            message => {
                log::trace!("ignoring {:?} for Window({:#0x})", message, window);
                Ok(())
            },
        }
    }

    /// Apply a configure request (or its EWMH equivalents) to a client.
    /// `gravity` of 0 means the client's own.
    pub(crate) fn apply_window_changes(
        &mut self,
        id: ClientId,
        req: &ConfigureRequestData,
        gravity: u32,
    ) -> Result<()> {
        let Some(screen) = self.clients.get(id).map(|c| &self.screens[c.screen]) else {
            return Ok(());
        };
        let dims = (screen.width, screen.height);
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };

        c.gravity = if gravity == 0 { c.gravity_hint } else { Gravity::from(gravity) };

        if let Some(x) = req.x {
            c.rect.x = x;
        }
        if let Some(y) = req.y {
            c.rect.y = y;
        }

        if req.has_size() {
            let moved = req.has_position();
            if !moved {
                c.gravitate(-c.border, dims);
            }

            let mut dw = 0;
            let mut dh = 0;
            if let Some(width) = req.width {
                let width = bound(width, c.hints.min_width, c.hints.max_width);
                dw = width - c.rect.width;
                c.rect.width = width;
            }
            if let Some(height) = req.height {
                let height = bound(height, c.hints.min_height, c.hints.max_height);
                dh = height - c.rect.height;
                c.rect.height = height;
            }

            // The client only gets to keep its anchor when it does not move
            if !moved {
                let (sx, sy) = c.gravity.resize_shift(dw, dh);
                c.rect.x -= sx;
                c.rect.y -= sy;
                c.gravitate(c.border, dims);
            }
        }

        if let Some(mode) = req.stack_mode {
            self.restack_request(id, mode, req.sibling)?;
        }

        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };
        let (x, y) = c.frame_origin();
        self.conn
            .configure_frame(c.parent, Rectangle::new(x, y, c.rect.width, c.rect.height), c.border)?;
        self.conn
            .move_resize(c.window, Rectangle::new(0, 0, c.rect.width, c.rect.height))?;

        if req.has_position() && !req.has_size() {
            self.send_config(id)?;
        }
        Ok(())
    }

    fn restack_request(&mut self, id: ClientId, mode: StackMode, sibling: Option<Window>) -> Result<()> {
        let sibling = sibling.map(|s| (s, self.clients.find(s)));

        match (mode, sibling) {
            (StackMode::Above, None) => self.raise(id),
            // Above a sibling is under whatever is directly above it
            (StackMode::Above, Some((_, Some(sib)))) => {
                let order = self.clients.stacking_order();
                match order.iter().position(|&c| c == sib) {
                    Some(pos) => {
                        let upper = order.get(pos + 1).copied();
                        self.place_under(id, upper)
                    },
                    None => Ok(()),
                }
            },
            (StackMode::Below, None) => self.lower(id),
            (StackMode::Below, Some((_, Some(sib)))) => self.place_under(id, Some(sib)),
            (StackMode::Above | StackMode::Below, Some((window, None))) => {
                log::debug!("not restacking against unmanaged Window({:#0x})", window);
                Ok(())
            },
            (mode, _) => {
                log::debug!("cannot handle stack mode {:?}", mode);
                Ok(())
            },
        }
    }

    /// Errors about windows being set up or torn down are expected. Any
    /// other error about a client's window means it is gone.
    fn handle_error(&mut self, err: XError) {
        let window = err.bad_value;

        if self.initialising == Some(window) {
            log::debug!("ignoring error {:?} while initialising Window({:#0x})", err.kind, window);
            self.initialising = None;
            return;
        }
        if let Some((w, parent)) = self.removing {
            if window == w || window == parent {
                log::debug!("ignoring error {:?} while removing Window({:#0x})", err.kind, window);
                return;
            }
        }

        match (err.kind, self.clients.find(window)) {
            (XErrorKind::Window, Some(id)) => {
                log::debug!("Window({:#0x}) is gone, flagging for removal", window);
                if let Some(c) = self.clients.get_mut(id) {
                    c.remove = true;
                    self.need_tidy = true;
                }
            },
            _ => log::warn!(
                "X error {:?} on resource {:#0x} (request {})",
                err.kind,
                window,
                err.request
            ),
        }
    }
}

// ]]] === Handlers ===

// ============================= Interactive ============================== [[[

impl<X: XConn> WindowManager<X> {
    fn handle_modal(&mut self, event: XEvent) -> Result<()> {
        let next = match mem::take(&mut self.mode) {
            Mode::Idle => Ok(Mode::Idle),
            Mode::Dragging(drag) => self.drag_event(drag, event),
            Mode::Sweeping(sweep) => self.sweep_event(sweep, event),
            Mode::Cycling { keycode } => self.cycle_event(keycode, event),
            Mode::Info { trigger, banner } => self.info_event(trigger, banner, event),
        };

        match next {
            Ok(Mode::Idle) => self.release_deferred(),
            Ok(_) => {},
            Err(_) => {
                self.release_grabs();
                self.release_deferred();
            },
        }
        self.mode = next?;
        Ok(())
    }

    /// Drop whatever an interactive operation may hold after it failed, so
    /// the display is not left frozen
    fn release_grabs(&self) {
        let released = self
            .conn
            .ungrab_pointer()
            .and_then(|_| self.conn.ungrab_keyboard())
            .and_then(|_| self.conn.ungrab_server());
        if let Err(e) = released {
            log::error!("failed to release grabs: {:#}", e);
        }
    }

    /// Put the events held back by an interactive operation in front of
    /// everything else, in the order they arrived
    fn release_deferred(&mut self) {
        while let Some(event) = self.deferred.pop_back() {
            self.pending.push_front(event);
        }
    }

    /// Skip to the latest of a run of queued motion events
    fn coalesce_motion(&mut self, mut latest: MotionEvent) -> Result<MotionEvent> {
        while let Some(event) = self.next_queued()? {
            match event {
                XEvent::Motion(motion) => latest = motion,
                other => {
                    self.pending.push_front(other);
                    break;
                },
            }
        }
        Ok(latest)
    }

    /// The current outline of a client
    fn outline_of(&self, id: ClientId) -> Option<Outline> {
        let c = self.clients.get(id)?;
        let (cols, rows) = c.hints.in_increments(c.rect.width, c.rect.height);
        Some(Outline {
            root:   self.screens[c.screen].root,
            rect:   c.rect,
            border: c.border,
            label:  format!("{}x{}+{}+{}", cols, rows, c.rect.x, c.rect.y),
        })
    }

    /// Grab the server and draw a client's outline. The server stays grabbed
    /// until the outline is erased.
    pub(crate) fn draw_outline(&self, id: ClientId) -> Result<Option<Outline>> {
        let Some(outline) = self.outline_of(id) else {
            return Ok(None);
        };
        self.conn.sync();
        self.conn.grab_server()?;
        self.conn
            .draw_outline(outline.root, outline.rect, outline.border, &outline.label)?;
        Ok(Some(outline))
    }

    /// Erase `old` and draw the client's outline where it is now
    fn redraw_outline(&self, old: &Outline, id: ClientId) -> Result<Option<Outline>> {
        self.conn.draw_outline(old.root, old.rect, old.border, &old.label)?;
        let Some(outline) = self.outline_of(id) else {
            self.conn.ungrab_server()?;
            return Ok(None);
        };
        self.conn
            .draw_outline(outline.root, outline.rect, outline.border, &outline.label)?;
        Ok(Some(outline))
    }

    fn erase_outline(&self, outline: &Outline) -> Result<()> {
        self.conn
            .draw_outline(outline.root, outline.rect, outline.border, &outline.label)?;
        self.conn.ungrab_server()
    }

    /// Edges a client on `monitor` snaps to: the monitor and the other
    /// visible clients of its screen
    fn snap_targets(&self, id: ClientId, monitor: &Rectangle) -> Vec<SnapTarget> {
        let Some(c) = self.clients.get(id) else {
            return vec![];
        };

        std::iter::once(SnapTarget::monitor(monitor, c.border))
            .chain(
                self.clients
                    .iter()
                    .filter(|&(other, o)| other != id && o.screen == c.screen && self.is_visible(other))
                    .map(|(_, o)| SnapTarget { rect: o.rect, border: o.border }),
            )
            .collect()
    }

    /// End a drag or sweep: the client gets its final geometry and is raised
    fn finish_pointer_op(&mut self, id: ClientId, outline: Option<&Outline>) -> Result<Mode> {
        if let Some(outline) = outline {
            self.erase_outline(outline)?;
        }
        self.conn.ungrab_pointer()?;
        self.moveresize_raise(id)?;
        self.update_net_wm_state(id)?;
        Ok(Mode::Idle)
    }

    /// Give up on a drag or sweep whose client went away
    fn abandon_pointer_op(&mut self, outline: Option<&Outline>, event: XEvent) -> Result<Mode> {
        log::debug!("client vanished during an interactive operation");
        if let Some(outline) = outline {
            self.erase_outline(outline)?;
        }
        self.conn.ungrab_pointer()?;
        self.deferred.push_back(event);
        Ok(Mode::Idle)
    }

    fn drag_event(&mut self, mut drag: Drag, event: XEvent) -> Result<Mode> {
        if self.clients.get(drag.client).is_none() {
            return self.abandon_pointer_op(drag.outline.as_ref(), event);
        }

        match event {
            XEvent::Motion(motion) => {
                let motion = self.coalesce_motion(motion)?;
                self.drag_to(&mut drag, motion.root_pos, motion.state)?;
                Ok(Mode::Dragging(drag))
            },
            XEvent::ButtonRelease(e) if e.button == drag.button =>
                self.finish_pointer_op(drag.client, drag.outline.as_ref()),
            XEvent::ButtonPress(_) | XEvent::ButtonRelease(_) => Ok(Mode::Dragging(drag)),
            other => {
                self.deferred.push_back(other);
                Ok(Mode::Dragging(drag))
            },
        }
    }

    /// Move the dragged client to follow the pointer, snapping to nearby
    /// edges unless `altmask` is held
    fn drag_to(&mut self, drag: &mut Drag, pointer: Point, state: u16) -> Result<()> {
        let id = drag.client;
        let snap = self.settings.snap;
        let targets = if snap != 0 && state & self.binds.groups.altmask == 0 {
            self.snap_targets(id, &drag.monitor)
        } else {
            vec![]
        };
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };

        c.rect.x = drag.origin.x + pointer.x - drag.start.x;
        c.rect.y = drag.origin.y + pointer.y - drag.start.y;
        if !targets.is_empty() {
            let snapped = placement::snap(&c.rect, c.border, &targets, snap);
            c.rect.x = snapped.x;
            c.rect.y = snapped.y;
        }

        match drag.outline.take() {
            Some(old) => drag.outline = self.redraw_outline(&old, id)?,
            None => {
                let (x, y) = c.frame_origin();
                self.conn.move_window(c.parent, x, y)?;
                self.send_config(id)?;
            },
        }
        Ok(())
    }

    fn sweep_event(&mut self, mut sweep: Sweep, event: XEvent) -> Result<Mode> {
        if self.clients.get(sweep.client).is_none() {
            return self.abandon_pointer_op(sweep.outline.as_ref(), event);
        }

        match event {
            XEvent::Motion(motion) => {
                let motion = self.coalesce_motion(motion)?;
                self.sweep_to(&mut sweep, motion.root_pos, motion.state)?;
                Ok(Mode::Sweeping(sweep))
            },
            XEvent::ButtonRelease(e) if e.button == sweep.button => {
                self.sweep_to(&mut sweep, e.root_pos, e.state)?;
                self.finish_pointer_op(sweep.client, sweep.outline.as_ref())
            },
            XEvent::ButtonPress(_) | XEvent::ButtonRelease(_) => Ok(Mode::Sweeping(sweep)),
            other => {
                self.deferred.push_back(other);
                Ok(Mode::Sweeping(sweep))
            },
        }
    }

    /// Resize the swept client to reach the pointer. Maximised axes stay as
    /// they are unless `altmask` is held, which also forgets them.
    fn sweep_to(&mut self, sweep: &mut Sweep, pointer: Point, state: u16) -> Result<()> {
        let id = sweep.client;
        let force = state & self.binds.groups.altmask != 0;
        let snap = self.settings.snap;

        let pointer = if force || snap == 0 {
            pointer
        } else {
            let targets = self.snap_targets(id, &sweep.monitor);
            placement::snap_sweep(sweep.anchor, pointer, &targets, snap)
        };

        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };
        if force && (c.saved_horz.is_some() || c.saved_vert.is_some()) {
            c.saved_horz = None;
            c.saved_vert = None;
            self.conn.set_unmaximised(c.window, Axis::Horizontal, None)?;
            self.conn.set_unmaximised(c.window, Axis::Vertical, None)?;
        }

        c.rect = placement::sweep(
            &c.rect,
            &c.hints,
            sweep.anchor,
            pointer,
            c.saved_horz.is_some(),
            c.saved_vert.is_some(),
        );

        match sweep.outline.take() {
            Some(old) => sweep.outline = self.redraw_outline(&old, id)?,
            None => self.moveresize(id)?,
        }
        Ok(())
    }

    /// While cycling, the cycling key steps on and any other key ends it.
    /// That key is then handled as usual.
    fn cycle_event(&mut self, keycode: u8, event: XEvent) -> Result<Mode> {
        match event {
            XEvent::KeyPress(e) if e.keycode == keycode => {
                self.select_next()?;
                Ok(Mode::Cycling { keycode })
            },
            XEvent::KeyRelease(e) if e.keycode == keycode => Ok(Mode::Cycling { keycode }),
            XEvent::KeyPress(_) | XEvent::KeyRelease(_) => {
                self.conn.ungrab_keyboard()?;
                self.conn.ungrab_pointer()?;
                if let Some(cur) = self.current {
                    self.clients.touch(cur);
                }
                self.pending.push_front(event);
                Ok(Mode::Idle)
            },
            other => {
                self.deferred.push_back(other);
                Ok(Mode::Cycling { keycode })
            },
        }
    }

    fn info_event(&mut self, trigger: InfoTrigger, banner: Option<Window>, event: XEvent) -> Result<Mode> {
        let done = match (trigger, &event) {
            (InfoTrigger::Key(code), XEvent::KeyRelease(e)) if e.keycode == code =>
                Some(!self.is_autorepeat(e.keycode, e.time)?),
            (InfoTrigger::Button(button), XEvent::ButtonRelease(e)) => Some(e.button == button),
            (
                _,
                XEvent::KeyPress(_)
                | XEvent::KeyRelease(_)
                | XEvent::ButtonPress(_)
                | XEvent::ButtonRelease(_)
                | XEvent::Motion(_),
            ) => Some(false),
            _ => None,
        };

        let Some(done) = done else {
            self.deferred.push_back(event);
            return Ok(Mode::Info { trigger, banner });
        };
        if !done {
            return Ok(Mode::Info { trigger, banner });
        }

        if let Some(banner) = banner {
            self.conn.destroy(banner)?;
        }
        match trigger {
            InfoTrigger::Key(_) => self.conn.ungrab_keyboard()?,
            InfoTrigger::Button(_) => self.conn.ungrab_pointer()?,
        }
        Ok(Mode::Idle)
    }

    /// Whether a key release is one half of an autorepeat pair: a press of
    /// the same key at the same time follows straight away
    fn is_autorepeat(&mut self, keycode: u8, time: u32) -> Result<bool> {
        match self.next_queued()? {
            Some(XEvent::KeyPress(next)) if next.keycode == keycode && next.time == time => Ok(true),
            Some(other) => {
                self.pending.push_front(other);
                Ok(false)
            },
            None => Ok(false),
        }
    }
}

// ]]] === Interactive ===

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actions::tests::{button, key, ALT},
        manager::tests::{manage, wm},
        screen::Monitor,
        x::{
            event::{KeyEvent, MotionEvent},
            input::Keysym,
            mock::{MockXConn, ROOT},
            property::IcccmWindowState,
        },
    };

    fn motion(x: i32, y: i32, state: u16) -> XEvent {
        XEvent::Motion(MotionEvent { root: ROOT, root_pos: Point::new(x, y), state, time: 0 })
    }

    fn release(window: Window, b: u8, pos: Point) -> XEvent {
        XEvent::ButtonRelease(button(window, b, 0, pos))
    }

    fn unmap(window: Window) -> XEvent {
        XEvent::UnmapNotify { window, event: window }
    }

    fn message(wm: &mut WindowManager<MockXConn>, window: Window, message: NetMessage) {
        wm.handle_event(XEvent::ClientMessage { window, message }).unwrap();
    }

    #[test]
    fn unmaps_count_down_then_remove() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        wm.clients.get_mut(a).unwrap().ignore_unmap = 2;

        wm.handle_event(unmap(0x10)).unwrap();
        wm.handle_event(unmap(0x10)).unwrap();
        assert!(!wm.clients.get(a).unwrap().remove);
        assert!(!wm.need_tidy);

        wm.handle_event(unmap(0x10)).unwrap();
        assert!(wm.clients.get(a).unwrap().remove);
        assert!(wm.need_tidy);

        wm.tidy();
        assert!(wm.clients.is_empty());
        assert!(!wm.need_tidy);
        assert_eq!(wm.conn.wm_state(0x10), Some(IcccmWindowState::Withdrawn));
    }

    #[test]
    fn failed_withdraw_does_not_stop_the_sweep() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let b = manage(&mut wm, 0x11, Rectangle::new(200, 0, 100, 100));
        wm.handle_event(unmap(0x10)).unwrap();
        wm.handle_event(unmap(0x10)).unwrap();
        wm.handle_event(unmap(0x11)).unwrap();
        wm.handle_event(unmap(0x11)).unwrap();
        assert!(wm.clients.get(a).unwrap().remove && wm.clients.get(b).unwrap().remove);

        wm.conn.fail_requests("reparent 0x10 ");
        wm.tidy();
        assert!(wm.clients.is_empty());
        assert!(wm.clients.is_consistent());
        assert!(!wm.need_tidy);
        assert_eq!(wm.current, None);
        assert!(wm.conn.sent("reparent 0x11"));
        assert_eq!(wm.conn.wm_state(0x11), Some(IcccmWindowState::Withdrawn));
    }

    #[test]
    fn drag_snaps_to_neighbours() {
        let mut wm = wm();
        wm.settings.border_width = 0;
        wm.settings.snap = 10;
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let _b = manage(&mut wm, 0x11, Rectangle::new(105, 0, 100, 100));
        wm.conn.pointer.set(Point::new(50, 50));

        wm.handle_event(XEvent::ButtonPress(button(0x101, 1, ALT, Point::new(50, 50)))).unwrap();
        assert!(matches!(wm.mode, Mode::Dragging(_)));
        assert!(wm.conn.sent("grab_server"));

        wm.handle_event(motion(54, 50, ALT)).unwrap();
        assert_eq!(wm.clients.get(a).unwrap().rect, Rectangle::new(5, 0, 100, 100));

        wm.handle_event(release(ROOT, 1, Point::new(54, 50))).unwrap();
        assert_eq!(wm.mode, Mode::Idle);
        assert!(wm.conn.sent("ungrab_server"));
        assert!(wm.conn.sent("ungrab_pointer"));
        assert!(wm.conn.sent("move_resize 0x101 5 0 100 100"));
    }

    #[test]
    fn altmask_drags_without_snapping() {
        let mut wm = wm();
        wm.settings.border_width = 0;
        wm.settings.snap = 10;
        wm.settings.solid_drag = true;
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let _b = manage(&mut wm, 0x11, Rectangle::new(105, 0, 100, 100));
        wm.conn.pointer.set(Point::new(50, 50));
        wm.conn.clear_requests();

        wm.handle_event(XEvent::ButtonPress(button(0x101, 1, ALT, Point::new(50, 50)))).unwrap();
        wm.handle_event(motion(54, 50, ALT | wm.binds.groups.altmask)).unwrap();
        assert_eq!(wm.clients.get(a).unwrap().rect.x, 4);
        // Solid drags move the frame and draw nothing
        assert!(wm.conn.sent("move 0x101 4 0"));
        assert!(!wm.conn.sent("grab_server"));
    }

    #[test]
    fn queued_motion_is_coalesced() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        wm.conn.pointer.set(Point::new(10, 10));
        wm.handle_button_press(button(0x101, 1, ALT, Point::new(10, 10))).unwrap();
        let origin = wm.clients.get(a).unwrap().rect;

        wm.conn.push_event(motion(30, 30, ALT));
        wm.conn.push_event(motion(60, 40, ALT));
        wm.conn.push_event(XEvent::MapRequest(0x20));
        wm.handle_event(motion(20, 20, ALT)).unwrap();

        let rect = wm.clients.get(a).unwrap().rect;
        assert_eq!((rect.x, rect.y), (origin.x + 50, origin.y + 30));
        // The first event that is not motion goes back in the queue
        assert_eq!(wm.pending.front(), Some(&XEvent::MapRequest(0x20)));
        assert!(wm.conn.events.borrow().is_empty());
    }

    #[test]
    fn events_during_a_drag_are_replayed() {
        let mut wm = wm();
        manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        wm.handle_button_press(button(0x101, 1, ALT, Point::new(10, 10))).unwrap();

        wm.conn.add_window(0x20, Rectangle::new(300, 300, 50, 50), "late");
        wm.conn.with_window(0x20, |w| w.attrs.viewable = true);
        wm.handle_event(XEvent::MapRequest(0x20)).unwrap();
        assert!(wm.clients.find(0x20).is_none());
        assert_eq!(wm.deferred.len(), 1);

        wm.handle_event(release(ROOT, 1, Point::new(10, 10))).unwrap();
        assert!(wm.deferred.is_empty());
        assert_eq!(wm.pending.len(), 1);

        wm.step().unwrap();
        assert!(wm.clients.find(0x20).is_some());
    }

    #[test]
    fn sweep_resizes_to_the_pointer() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        assert_eq!(wm.clients.get(a).unwrap().rect, Rectangle::new(1, 1, 100, 100));
        wm.conn.clear_requests();

        wm.handle_button_press(button(0x101, 2, ALT, Point::new(50, 50))).unwrap();
        assert!(matches!(wm.mode, Mode::Sweeping(_)));
        assert!(wm.conn.sent("outline 1 1 100 100 1 100x100+1+1"));

        wm.handle_event(motion(201, 151, ALT)).unwrap();
        assert_eq!(wm.clients.get(a).unwrap().rect, Rectangle::new(1, 1, 200, 150));
        assert!(wm.conn.sent("outline 1 1 200 150 1 200x150+1+1"));

        wm.handle_event(release(ROOT, 2, Point::new(201, 151))).unwrap();
        assert_eq!(wm.mode, Mode::Idle);
        assert!(wm.conn.sent("move_resize 0x101 0 0 200 150"));
        assert!(wm.conn.sent("ungrab_server"));
    }

    #[test]
    fn failed_sweep_releases_its_grabs() {
        let mut wm = wm();
        manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        wm.handle_button_press(button(0x101, 2, ALT, Point::new(50, 50))).unwrap();
        assert!(wm.conn.sent("grab_server"));
        wm.conn.clear_requests();

        wm.conn.fail_requests("outline");
        assert!(wm.handle_event(motion(201, 151, ALT)).is_err());
        assert_eq!(wm.mode, Mode::Idle);
        assert!(wm.conn.sent("ungrab_pointer"));
        assert!(wm.conn.sent("ungrab_server"));
    }

    #[test]
    fn cycling_steps_and_puts_the_ending_key_back() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let b = manage(&mut wm, 0x11, Rectangle::new(200, 0, 100, 100));
        let c = manage(&mut wm, 0x12, Rectangle::new(400, 0, 100, 100));
        assert_eq!(wm.current, Some(c));

        let tab = key(&wm, 0xff09, ALT, 0);
        wm.handle_event(XEvent::KeyPress(tab)).unwrap();
        assert_eq!(wm.current, Some(b));
        assert_eq!(wm.mode, Mode::Cycling { keycode: tab.keycode });

        wm.handle_event(XEvent::KeyRelease(tab)).unwrap();
        wm.handle_event(XEvent::KeyPress(tab)).unwrap();
        assert_eq!(wm.current, Some(a));

        let other = KeyEvent { keycode: 250, ..tab };
        wm.handle_event(XEvent::KeyRelease(other)).unwrap();
        assert_eq!(wm.mode, Mode::Idle);
        assert!(wm.conn.sent("ungrab_keyboard"));
        assert_eq!(wm.clients.tab_order().first(), Some(&a));
        assert_eq!(wm.pending.front(), Some(&XEvent::KeyRelease(other)));
    }

    #[test]
    fn info_banner_survives_autorepeat() {
        let mut wm = wm();
        manage(&mut wm, 0x10, Rectangle::new(20, 30, 200, 100));
        let info = key(&wm, 'i' as Keysym, crate::actions::tests::CTRL_ALT, 5);
        wm.handle_event(XEvent::KeyPress(info)).unwrap();
        assert!(matches!(wm.mode, Mode::Info { .. }));

        wm.conn.push_event(XEvent::KeyPress(info));
        wm.handle_event(XEvent::KeyRelease(info)).unwrap();
        assert!(matches!(wm.mode, Mode::Info { .. }));
        assert!(!wm.conn.sent("destroy"));

        wm.handle_event(XEvent::KeyRelease(KeyEvent { time: 9, ..info })).unwrap();
        assert_eq!(wm.mode, Mode::Idle);
        assert!(wm.conn.sent("destroy 0x102"));
        assert!(wm.conn.sent("ungrab_keyboard"));
    }

    #[test]
    fn configure_requests_respect_gravity() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(20, 30, 200, 100));
        wm.conn.clear_requests();

        let resize = ConfigureRequestData { window: 0x10, width: Some(300), ..Default::default() };
        wm.handle_event(XEvent::ConfigureRequest(resize)).unwrap();
        assert_eq!(wm.clients.get(a).unwrap().rect, Rectangle::new(21, 31, 300, 100));
        assert!(wm.conn.sent("configure_frame 0x101 20 30 300 100 1"));
        assert!(wm.conn.sent("move_resize 0x10 0 0 300 100"));
        assert!(!wm.conn.sent("configure_notify"));

        let moved = ConfigureRequestData { window: 0x10, x: Some(50), y: Some(60), ..Default::default() };
        wm.handle_event(XEvent::ConfigureRequest(moved)).unwrap();
        assert!(wm.conn.sent("configure_frame 0x101 49 59 300 100 1"));
        assert!(wm.conn.sent("configure_notify 0x10 50 60 300 100"));
    }

    #[test]
    fn configure_requests_of_others() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(20, 30, 200, 100));
        wm.conn.clear_requests();

        let unmanaged = ConfigureRequestData { window: 0x30, x: Some(5), ..Default::default() };
        wm.handle_event(XEvent::ConfigureRequest(unmanaged)).unwrap();
        assert!(wm.conn.sent("configure_unmanaged 0x30"));

        wm.clients.get_mut(a).unwrap().manual = true;
        wm.conn.clear_requests();
        let ignored = ConfigureRequestData { window: 0x10, width: Some(5), ..Default::default() };
        wm.handle_event(XEvent::ConfigureRequest(ignored)).unwrap();
        assert!(wm.conn.requests().is_empty());
    }

    #[test]
    fn stacking_requests() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let b = manage(&mut wm, 0x11, Rectangle::new(50, 50, 100, 100));
        let c = manage(&mut wm, 0x12, Rectangle::new(60, 60, 100, 100));

        let above_b = ConfigureRequestData {
            window: 0x10,
            sibling: Some(0x11),
            stack_mode: Some(StackMode::Above),
            ..Default::default()
        };
        wm.handle_event(XEvent::ConfigureRequest(above_b)).unwrap();
        assert_eq!(wm.clients.stacking_order(), &[b, a, c]);

        message(&mut wm, 0x12, NetMessage::RestackWindow { source: 2, sibling: 0x11, detail: 1 });
        assert_eq!(wm.clients.stacking_order(), &[c, b, a]);

        // Not from a pager
        message(&mut wm, 0x12, NetMessage::RestackWindow { source: 1, sibling: 0, detail: 0 });
        assert_eq!(wm.clients.stacking_order(), &[c, b, a]);
    }

    #[test]
    fn map_requests_manage_or_show() {
        let mut wm = wm();
        wm.conn.add_window(0x20, Rectangle::new(10, 10, 100, 100), "new");
        wm.handle_event(XEvent::MapRequest(0x20)).unwrap();
        let id = wm.clients.find(0x20).unwrap();

        wm.client_to_vdesk(id, Vdesk::Desk(4)).unwrap();
        wm.handle_event(XEvent::MapRequest(0x20)).unwrap();
        assert_eq!(wm.screens[0].vdesk, Vdesk::Desk(4));
        assert_eq!(wm.conn.wm_state(0x20), Some(IcccmWindowState::Normal));
    }

    #[test]
    fn enter_focuses_visible_clients() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let b = manage(&mut wm, 0x11, Rectangle::new(200, 0, 100, 100));

        wm.handle_event(XEvent::EnterNotify(0x10)).unwrap();
        assert_eq!(wm.current, Some(a));
        assert_eq!(wm.clients.tab_order().first(), Some(&a));

        wm.client_to_vdesk(b, Vdesk::Desk(2)).unwrap();
        wm.handle_event(XEvent::EnterNotify(0x11)).unwrap();
        assert_eq!(wm.current, Some(a));
    }

    #[test]
    fn pager_messages() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let b = manage(&mut wm, 0x11, Rectangle::new(200, 0, 100, 100));
        assert_eq!(wm.current, Some(b));

        message(&mut wm, 0x10, NetMessage::ActiveWindow { source: 1 });
        assert_eq!(wm.current, Some(b));
        message(&mut wm, 0x10, NetMessage::ActiveWindow { source: 2 });
        assert_eq!(wm.current, Some(a));

        message(&mut wm, 0x11, NetMessage::CloseWindow { source: 1 });
        assert!(!wm.conn.sent("kill"));
        message(&mut wm, 0x11, NetMessage::CloseWindow { source: 2 });
        assert!(wm.conn.sent("kill 0x11"));

        message(&mut wm, 0x11, NetMessage::WmDesktop { desktop: 4, source: 2 });
        assert_eq!(wm.clients.get(b).unwrap().vdesk, Vdesk::Desk(4));
        assert_eq!(wm.conn.desktop_of(0x11), Some(4));

        message(&mut wm, ROOT, NetMessage::CurrentDesktop(4));
        assert_eq!(wm.screens[0].vdesk, Vdesk::Desk(4));
        assert!(wm.is_visible(b));

        let flags = (2 << 12) | (0b0011 << 8);
        message(&mut wm, 0x11, NetMessage::MoveResizeWindow { flags, x: 40, y: 50, width: 0, height: 0 });
        assert_eq!(wm.clients.get(b).unwrap().rect.x, 40);
        assert!(wm.conn.sent("configure_notify 0x11 40 50"));
    }

    #[test]
    fn state_messages_maximise() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(20, 20, 100, 100));
        let before = wm.clients.get(a).unwrap().rect;

        let fullscreen = NetMessage::WmState { action: 2, first: Some(NetWmState::Fullscreen), second: None };
        message(&mut wm, 0x10, fullscreen);
        let c = wm.clients.get(a).unwrap();
        assert_eq!(c.rect, Rectangle::new(0, 0, 1280, 1024));
        assert_eq!(c.border, 0);
        assert!(wm.conn.states(0x10).contains(&NetWmState::Fullscreen));

        message(&mut wm, 0x10, fullscreen);
        assert_eq!(wm.clients.get(a).unwrap().rect, before);

        // Manual clients keep their geometry
        wm.clients.get_mut(a).unwrap().manual = true;
        let vert = NetMessage::WmState { action: 1, first: Some(NetWmState::MaximizedVert), second: None };
        message(&mut wm, 0x10, vert);
        assert!(wm.clients.get(a).unwrap().saved_vert.is_none());
    }

    #[test]
    fn frame_extents_for_unmanaged_windows() {
        let mut wm = wm();
        message(&mut wm, 0x30, NetMessage::RequestFrameExtents);
        assert!(wm.conn.sent("frame_extents 0x30 1"));
    }

    #[test]
    fn errors_mark_clients_gone() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let error = |bad_value| XEvent::Error(XError { bad_value, kind: XErrorKind::Window, request: 12 });

        // Expected while the window is being set up
        wm.initialising = Some(0x10);
        wm.handle_event(error(0x10)).unwrap();
        assert_eq!(wm.initialising, None);
        assert!(!wm.clients.get(a).unwrap().remove);

        wm.handle_event(error(0x10)).unwrap();
        assert!(wm.clients.get(a).unwrap().remove);

        wm.conn.push_event(XEvent::Unknown(0));
        wm.step().unwrap();
        assert!(wm.clients.is_empty());
    }

    #[test]
    fn guards_reset_on_unrelated_events() {
        let mut wm = wm();
        wm.initialising = Some(0x10);
        wm.removing = Some((0x11, 0x101));

        wm.handle_event(XEvent::DestroyNotify(0x11)).unwrap();
        assert_eq!(wm.removing, Some((0x11, 0x101)));

        wm.handle_event(XEvent::Unknown(0)).unwrap();
        assert_eq!(wm.initialising, None);
        assert_eq!(wm.removing, None);
    }

    #[test]
    fn screen_change_rescales() {
        let mut wm = wm();
        wm.conn.monitors = vec![Monitor::new(Rectangle::new(0, 0, 640, 512), None)];
        wm.handle_event(XEvent::ScreenChange { root: ROOT, width: 640, height: 512 }).unwrap();

        assert_eq!((wm.screens[0].width, wm.screens[0].height), (640, 512));
        assert_eq!(wm.screens[0].monitors[0].rect, Rectangle::new(0, 0, 640, 512));
        assert!(wm.conn.sent("desktop_geometry 640 512"));
    }

    #[test]
    fn run_stops_on_flags() {
        let mut wm = wm();
        let quit = AtomicBool::new(false);
        let reload = AtomicBool::new(true);
        assert_eq!(wm.run(&quit, &reload).unwrap(), Exit::Reload);
        assert!(!reload.load(Ordering::SeqCst));

        quit.store(true, Ordering::SeqCst);
        assert_eq!(wm.run(&quit, &reload).unwrap(), Exit::Quit);
    }
}
