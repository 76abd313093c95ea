//! Running bindings: grabbing their keys and buttons, working out what they
//! act on and the functions themselves

use crate::{
    bind::{lock_variants, Bind, BindFlags, Function, Trigger},
    client::{ClientId, Vdesk},
    events::{Drag, InfoTrigger, Mode, Sweep},
    geometry::{bound, Point, Rectangle},
    manager::WindowManager,
    placement::{self, MaximiseAction},
    utils,
    x::{
        event::{ButtonEvent, KeyEvent},
        CursorKind,
        Window,
        XConn,
    },
};
use anyhow::Result;

/// The input that set a binding off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Input {
    Key(KeyEvent),
    Button(ButtonEvent),
}

impl Input {
    pub(crate) const fn time(&self) -> u32 {
        match self {
            Self::Key(e) => e.time,
            Self::Button(e) => e.time,
        }
    }
}

/// What a binding acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Client(ClientId),
    Screen(usize),
    Nothing,
}

// ================================ Grabs ================================= [[[

impl<X: XConn> WindowManager<X> {
    /// Grab every key binding, and the button bindings that do not act on a
    /// client, on a screen's root
    pub(crate) fn grab_for_screen(&self, screen: usize) -> Result<()> {
        let root = self.screens[screen].root;
        self.conn.ungrab_all_keys(root)?;
        self.conn.ungrab_all_buttons(root)?;

        for bind in self.binds.binds() {
            match bind.trigger {
                Trigger::Key(sym) =>
                    for code in self.conn.keysym_to_keycodes(sym) {
                        for state in lock_variants(bind.state, self.numlock) {
                            self.conn.grab_key(root, code, state)?;
                        }
                    },
                Trigger::Button(button) if !bind.flags.contains(BindFlags::CLIENT) =>
                    for state in lock_variants(bind.state, self.numlock) {
                        self.conn.grab_button(root, button, state)?;
                    },
                Trigger::Button(_) => {},
            }
        }

        Ok(())
    }

    /// Grab every button binding on a client's frame
    pub(crate) fn grab_for_client(&self, id: ClientId) -> Result<()> {
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };
        self.conn.ungrab_all_buttons(c.parent)?;

        for bind in self.binds.binds() {
            if let Trigger::Button(button) = bind.trigger {
                for state in lock_variants(bind.state, self.numlock) {
                    self.conn.grab_button(c.parent, button, state)?;
                }
            }
        }

        Ok(())
    }

    /// Set the bindings aside so that input reaches the clients, leaving only
    /// what brings them back
    pub(crate) fn stash_binds(&mut self, screen: usize) -> Result<()> {
        let Some(buttons) = self.binds.stash() else {
            return Ok(());
        };
        log::info!("bindings disabled");

        let frames = self
            .clients
            .iter()
            .filter(|(_, c)| c.screen == screen)
            .map(|(_, c)| c.parent)
            .collect::<Vec<_>>();
        for bind in &buttons {
            if let Trigger::Button(button) = bind.trigger {
                for &frame in &frames {
                    for state in lock_variants(bind.state, self.numlock) {
                        self.conn.ungrab_button(frame, button, state)?;
                    }
                }
            }
        }

        self.grab_for_screen(screen)?;
        self.binds.restore_buttons(buttons);
        Ok(())
    }

    pub(crate) fn unstash_binds(&mut self, screen: usize) -> Result<()> {
        if !self.binds.unstash() {
            return Ok(());
        }
        log::info!("bindings enabled");

        self.grab_for_screen(screen)?;
        let ids = self.clients.iter().map(|(id, _)| id).collect::<Vec<_>>();
        for id in ids {
            self.grab_for_client(id)?;
        }
        Ok(())
    }

    /// Follow a change of the keyboard mapping
    pub(crate) fn keyboard_mapping_changed(&mut self) -> Result<()> {
        self.conn.refresh_keymap()?;
        self.numlock = self.conn.numlock_mask()?;
        for screen in 0..self.screens.len() {
            self.grab_for_screen(screen)?;
        }
        Ok(())
    }
}

// ]]] === Grabs ===

// ============================== Dispatch ================================ [[[

impl<X: XConn> WindowManager<X> {
    pub(crate) fn handle_key_press(&mut self, event: KeyEvent) -> Result<()> {
        let sym = self.conn.keycode_to_keysym(event.keycode);
        match self.binds.lookup(Trigger::Key(sym), event.state, self.numlock).copied() {
            Some(bind) => self.run_bind(bind, Input::Key(event)),
            None => Ok(()),
        }
    }

    pub(crate) fn handle_button_press(&mut self, event: ButtonEvent) -> Result<()> {
        match self
            .binds
            .resolve(Trigger::Button(event.button), event.state, self.numlock)
            .copied()
        {
            Some(bind) => self.run_bind(bind, Input::Button(event)),
            None => {
                log::error!(
                    "no binding for button {} with state {:#06x}",
                    event.button,
                    event.state
                );
                Ok(())
            },
        }
    }

    /// Screen the pointer is on
    pub(crate) fn pointer_screen(&self) -> Result<Option<usize>> {
        let Some(first) = self.screens.first() else {
            return Ok(None);
        };
        let pointer = self.conn.query_pointer(first.root)?;
        Ok(self.screen_of_root(pointer.root))
    }

    pub(crate) fn screen_of_root(&self, root: Window) -> Option<usize> {
        self.screens.iter().position(|s| s.root == root)
    }

    /// Resolve what a binding acts on and run it. A binding whose target
    /// cannot be found does nothing.
    fn run_bind(&mut self, bind: Bind, input: Input) -> Result<()> {
        let target = if bind.flags.contains(BindFlags::CLIENT) {
            let id = match input {
                Input::Key(_) => self.current,
                Input::Button(e) => self.clients.find(e.window),
            };
            match id {
                Some(id) => Target::Client(id),
                None => return Ok(()),
            }
        } else if bind.flags.contains(BindFlags::SCREEN) {
            match self.pointer_screen()? {
                Some(screen) => Target::Screen(screen),
                None => return Ok(()),
            }
        } else {
            Target::Nothing
        };

        log::debug!("running {} on {:?}", bind, target);
        let flags = bind.flags;

        match (bind.function, target) {
            (Function::Delete, Target::Client(id)) => self.func_delete(id, flags),
            (Function::Dock, Target::Client(id)) => self.func_dock(id, flags),
            (Function::Docks, Target::Screen(s)) => self.func_docks(s, flags),
            (Function::Info, Target::Client(id)) => self.func_info(id, input),
            (Function::Lower, Target::Client(id)) => self.lower(id),
            (Function::Raise, Target::Client(id)) => self.raise(id),
            (Function::Move, Target::Client(id)) => self.func_move(id, flags, input),
            (Function::Resize, Target::Client(id)) => self.func_resize(id, flags, input),
            (Function::Next, _) => self.func_next(input),
            (Function::Spawn, _) => {
                if let Err(e) = utils::spawn(&self.settings.term) {
                    log::error!("{:#}", e);
                }
                Ok(())
            },
            (Function::Vdesk, Target::Screen(s)) => {
                let vdesk = self.vdesk_from_flags(s, flags);
                self.switch_vdesk(s, vdesk)
            },
            (Function::Fix, Target::Client(id)) => self.func_fix(id, flags),
            (Function::Binds, Target::Screen(s)) => self.func_binds(s, flags),
            (function, target) => {
                log::debug!("{} does not act on {:?}", function, target);
                Ok(())
            },
        }
    }
}

// ]]] === Dispatch ===

// ============================== Functions =============================== [[[

impl<X: XConn> WindowManager<X> {
    /// Ask a client to close, or with a value kill it
    pub(crate) fn func_delete(&mut self, id: ClientId, flags: BindFlags) -> Result<()> {
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };

        if flags.value() == 0 && self.conn.supports_delete(c.window) {
            log::debug!("asking Window({:#0x}) to close", c.window);
            self.conn.send_delete(c.window)
        } else {
            log::debug!("killing Window({:#0x})", c.window);
            self.conn.kill_client(c.window)
        }
    }

    fn func_dock(&mut self, id: ClientId, flags: BindFlags) -> Result<()> {
        if let Some(c) = self.clients.get_mut(id) {
            c.is_dock = if flags.contains(BindFlags::TOGGLE) {
                !c.is_dock
            } else if flags.contains(BindFlags::UP) {
                true
            } else if flags.contains(BindFlags::DOWN) {
                false
            } else {
                c.is_dock
            };
        }
        self.update_net_wm_state(id)
    }

    fn func_docks(&mut self, screen: usize, flags: BindFlags) -> Result<()> {
        let visible = if flags.contains(BindFlags::TOGGLE) {
            !self.screens[screen].docks_visible
        } else if flags.contains(BindFlags::UP) {
            true
        } else if flags.contains(BindFlags::DOWN) {
            false
        } else {
            return Ok(());
        };
        self.set_docks_visible(screen, visible)
    }

    fn func_binds(&mut self, screen: usize, flags: BindFlags) -> Result<()> {
        let enable = if flags.contains(BindFlags::TOGGLE) {
            self.binds.is_stashed()
        } else if flags.contains(BindFlags::UP) {
            true
        } else if flags.contains(BindFlags::DOWN) {
            false
        } else {
            return Ok(());
        };

        if enable {
            self.unstash_binds(screen)
        } else {
            self.stash_binds(screen)
        }
    }

    fn func_fix(&mut self, id: ClientId, flags: BindFlags) -> Result<()> {
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };

        let fix = if flags.contains(BindFlags::TOGGLE) {
            !c.is_fixed()
        } else if flags.contains(BindFlags::UP) {
            true
        } else if flags.contains(BindFlags::DOWN) {
            false
        } else {
            return Ok(());
        };

        let vdesk = if fix { Vdesk::Fixed } else { self.screens[c.screen].vdesk };
        self.client_to_vdesk(id, vdesk)
    }

    /// Show the info banner until the key or button is released
    fn func_info(&mut self, id: ClientId, input: Input) -> Result<()> {
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };
        let root = self.screens[c.screen].root;

        let trigger = match input {
            Input::Key(e) => {
                if !self.conn.grab_keyboard(root)? {
                    return Ok(());
                }
                InfoTrigger::Key(e.keycode)
            },
            Input::Button(e) => {
                if !self.conn.grab_pointer(root, CursorKind::None)? {
                    return Ok(());
                }
                InfoTrigger::Button(e.button)
            },
        };

        let banner = self.show_banner(id)?;
        self.mode = Mode::Info { trigger, banner };
        Ok(())
    }

    /// Put up a window with the title and geometry of a client
    fn show_banner(&self, id: ClientId) -> Result<Option<Window>> {
        let Some(c) = self.clients.get(id) else {
            return Ok(None);
        };
        let screen = &self.screens[c.screen];

        let (cols, rows) = c.hints.in_increments(c.rect.width, c.rect.height);
        let geometry = format!("{}x{}+{}+{}", cols, rows, c.rect.x, c.rect.y);
        let mut width = self.conn.text_width(&geometry) + 2;

        let mut lines = vec![];
        if let Some(name) = self.conn.window_name(c.window) {
            width = width.max(self.conn.text_width(&name) + 2);
            lines.push(name);
        }
        lines.push(geometry);

        let (ascent, descent) = self.conn.font_metrics();
        let height = (ascent + descent) * lines.len() as i32;
        let pos = placement::info_position(
            &c.rect,
            c.border,
            (width, height),
            (screen.width, screen.height),
        );

        self.conn
            .show_info(
                screen.root,
                Rectangle::new(pos.x, pos.y, width, height),
                &lines,
                screen.colors.active,
            )
            .map(Some)
    }

    /// Drag with the pointer, or step with the keyboard
    fn func_move(&mut self, id: ClientId, flags: BindFlags, input: Input) -> Result<()> {
        if let Input::Button(e) = input {
            if !flags.contains(BindFlags::RELATIVE) {
                return self.start_drag(id, e);
            }
        }

        let Some((mon, _)) = self.client_monitor(id) else {
            return Ok(());
        };
        let time = input.time();
        let quick = self
            .last_kbmove
            .map_or(false, |last| time.wrapping_sub(last) < self.settings.quickmove_ms);
        self.last_kbmove = Some(time);

        let (kbpx, quickmove) = (self.settings.kbpx, self.settings.quickmove);
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };

        let step = |hint: i32| {
            let inc = match flags.value() {
                0 if hint > 1 => hint,
                0 => kbpx,
                v => v as i32,
            };
            if quick {
                (f64::from(inc) * quickmove) as i32
            } else {
                inc
            }
        };
        let (dx, dy) = (step(c.hints.width_inc), step(c.hints.height_inc));
        let b = c.border;

        if flags.contains(BindFlags::RELATIVE) {
            if flags.contains(BindFlags::RIGHT) {
                c.rect.x += dx;
            }
            if flags.contains(BindFlags::LEFT) {
                c.rect.x -= dx;
            }
            if flags.contains(BindFlags::DOWN) {
                c.rect.y += dy;
            }
            if flags.contains(BindFlags::UP) {
                c.rect.y -= dy;
            }
        } else {
            if flags.contains(BindFlags::RIGHT) {
                c.rect.x = mon.x + mon.width - c.rect.width - b;
            }
            if flags.contains(BindFlags::LEFT) {
                c.rect.x = mon.x + b;
            }
            if flags.contains(BindFlags::BOTTOM) {
                c.rect.y = mon.y + mon.height - c.rect.height - b;
            }
            if flags.contains(BindFlags::TOP) {
                c.rect.y = mon.y + b;
            }
        }

        self.finish_keyboard_move(id)
    }

    /// Sweep with the pointer, resize with the keyboard or toggle maximise
    fn func_resize(&mut self, id: ClientId, flags: BindFlags, input: Input) -> Result<()> {
        if let Input::Button(e) = input {
            if !flags.intersects(BindFlags::TOGGLE | BindFlags::RELATIVE) {
                return self.start_sweep(id, e);
            }
        }

        if flags.contains(BindFlags::TOGGLE) {
            return self.maximise(
                id,
                MaximiseAction::Toggle,
                flags.contains(BindFlags::HORZ),
                flags.contains(BindFlags::VERT),
            );
        }

        let kbpx = self.settings.kbpx;
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };

        if flags.contains(BindFlags::RELATIVE) {
            let step = |hint: i32| if hint > 1 { hint } else { kbpx };
            let (dw, dh) = (step(c.hints.width_inc), step(c.hints.height_inc));

            if flags.contains(BindFlags::RIGHT) {
                c.rect.width += dw;
            }
            if flags.contains(BindFlags::LEFT) {
                c.rect.width -= dw;
            }
            if flags.contains(BindFlags::DOWN) {
                c.rect.height += dh;
            }
            if flags.contains(BindFlags::UP) {
                c.rect.height -= dh;
            }
        }

        self.finish_keyboard_move(id)
    }

    /// Apply a keyboard move or resize. An edge left at the border's width
    /// on a maximised axis goes back to 0.
    fn finish_keyboard_move(&mut self, id: ClientId) -> Result<()> {
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };

        if c.rect.x.abs() == c.border && c.saved_horz.is_some() {
            c.rect.x = 0;
        }
        if c.rect.y.abs() == c.border && c.saved_vert.is_some() {
            c.rect.y = 0;
        }
        c.rect.width = bound(c.rect.width, c.hints.min_width, c.hints.max_width);
        c.rect.height = bound(c.rect.height, c.hints.min_height, c.hints.max_height);

        self.moveresize(id)
    }

    /// Cycle focus while the keyboard is grabbed
    fn func_next(&mut self, input: Input) -> Result<()> {
        let Input::Key(e) = input else {
            return Ok(());
        };

        self.select_next()?;

        if self.conn.grab_keyboard(e.root)? {
            self.conn.grab_pointer(e.root, CursorKind::None)?;
            self.mode = Mode::Cycling { keycode: e.keycode };
        } else if let Some(cur) = self.current {
            self.clients.touch(cur);
        }
        Ok(())
    }
}

// ]]] === Functions ===

// ============================ Interactive =============================== [[[

impl<X: XConn> WindowManager<X> {
    /// Grab the pointer and start moving a client with it
    fn start_drag(&mut self, id: ClientId, event: ButtonEvent) -> Result<()> {
        let Some(root) = self.clients.get(id).map(|c| self.screens[c.screen].root) else {
            return Ok(());
        };
        if !self.conn.grab_pointer(root, CursorKind::Move)? {
            log::debug!("pointer grabbed elsewhere, not dragging");
            return Ok(());
        }

        self.raise(id)?;
        let start = self.conn.query_pointer(root)?.pos;
        let Some((monitor, _)) = self.client_monitor(id) else {
            return Ok(());
        };
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };

        let outline = if self.settings.solid_drag { None } else { self.draw_outline(id)? };

        self.mode = Mode::Dragging(Drag {
            client: id,
            button: event.button,
            origin: Point::new(c.rect.x, c.rect.y),
            start,
            monitor,
            outline,
        });
        Ok(())
    }

    /// Grab the pointer and start resizing a client from its top-left corner
    fn start_sweep(&mut self, id: ClientId, event: ButtonEvent) -> Result<()> {
        let Some(root) = self.clients.get(id).map(|c| self.screens[c.screen].root) else {
            return Ok(());
        };
        if !self.conn.grab_pointer(root, CursorKind::Resize)? {
            log::debug!("pointer grabbed elsewhere, not sweeping");
            return Ok(());
        }

        self.raise(id)?;
        let Some((monitor, _)) = self.client_monitor(id) else {
            return Ok(());
        };
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };

        let outline = if self.settings.solid_sweep { None } else { self.draw_outline(id)? };

        self.mode = Mode::Sweeping(Sweep {
            client: id,
            button: event.button,
            anchor: Point::new(c.rect.x, c.rect.y),
            monitor,
            outline,
        });
        Ok(())
    }
}

// ]]] === Interactive ===

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        manager::tests::{manage, wm},
        x::{
            input::Keysym,
            mock::{MockXConn, ROOT},
        },
    };

    pub(crate) const CTRL_ALT: u16 = 0x0c;
    pub(crate) const ALT: u16 = 0x08;
    pub(crate) const SHIFT: u16 = 0x01;

    pub(crate) fn key(wm: &WindowManager<MockXConn>, sym: Keysym, state: u16, time: u32) -> KeyEvent {
        KeyEvent {
            root: ROOT,
            window: ROOT,
            child: None,
            root_pos: Point::new(0, 0),
            state,
            keycode: wm.conn.keysym_to_keycodes(sym)[0],
            time,
        }
    }

    pub(crate) fn button(window: Window, button: u8, state: u16, pos: Point) -> ButtonEvent {
        ButtonEvent {
            root: ROOT,
            window,
            child: None,
            root_pos: pos,
            state,
            button,
            time: 0,
        }
    }

    #[test]
    fn screen_grabs_cover_lock_variants() {
        let wm = wm();
        wm.grab_for_screen(0).unwrap();
        let tab = wm.conn.keysym_to_keycodes(0xff09)[0];

        let reqs = wm.conn.requests();
        let tab_grabs = reqs
            .iter()
            .filter(|r| r.starts_with(&format!("grab_key 0x1 {} ", tab)))
            .count();
        assert_eq!(tab_grabs, 4);
        // Button bindings act on clients and are grabbed on their frames
        assert!(!wm.conn.sent("grab_button 0x1"));
    }

    #[test]
    fn keyboard_moves_and_quickmove() {
        let mut wm = wm();
        wm.settings.quickmove = 2.0;
        let id = manage(&mut wm, 0x10, Rectangle::new(99, 99, 100, 100));
        let start = wm.clients.get(id).unwrap().rect;

        wm.handle_key_press(key(&wm, 'l' as Keysym, CTRL_ALT, 1000)).unwrap();
        assert_eq!(wm.clients.get(id).unwrap().rect.x, start.x + 16);

        // Repeated within the quickmove window the step doubles
        wm.handle_key_press(key(&wm, 'j' as Keysym, CTRL_ALT, 1100)).unwrap();
        assert_eq!(wm.clients.get(id).unwrap().rect.y, start.y + 32);

        wm.handle_key_press(key(&wm, 'h' as Keysym, CTRL_ALT, 5000)).unwrap();
        assert_eq!(wm.clients.get(id).unwrap().rect.x, start.x);
    }

    #[test]
    fn absolute_moves_align_with_monitor() {
        let mut wm = wm();
        let id = manage(&mut wm, 0x10, Rectangle::new(99, 99, 100, 100));

        wm.handle_key_press(key(&wm, 'n' as Keysym, CTRL_ALT, 0)).unwrap();
        let c = wm.clients.get(id).unwrap();
        assert_eq!((c.rect.x, c.rect.y), (1280 - 100 - 1, 1024 - 100 - 1));
        assert!(wm.conn.sent("move_resize 0x101 1178 922 100 100"));

        wm.handle_key_press(key(&wm, 'y' as Keysym, CTRL_ALT, 0)).unwrap();
        let c = wm.clients.get(id).unwrap();
        assert_eq!((c.rect.x, c.rect.y), (1, 1));
    }

    #[test]
    fn keyboard_resize_respects_hints() {
        let mut wm = wm();
        let id = manage(&mut wm, 0x10, Rectangle::new(0, 0, 20, 20));
        wm.clients.get_mut(id).unwrap().hints.min_width = 10;

        wm.handle_key_press(key(&wm, 'h' as Keysym, CTRL_ALT | SHIFT, 0)).unwrap();
        assert_eq!(wm.clients.get(id).unwrap().rect.width, 10);

        wm.handle_key_press(key(&wm, 'x' as Keysym, CTRL_ALT, 0)).unwrap();
        let c = wm.clients.get(id).unwrap();
        assert_eq!(c.rect, Rectangle::new(0, 0, 1280, 1024));
        assert_eq!(c.border, 0);
    }

    #[test]
    fn delete_prefers_the_protocol() {
        let mut wm = wm();
        manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let escape = 0xff1b;

        wm.handle_key_press(key(&wm, escape, CTRL_ALT, 0)).unwrap();
        assert!(wm.conn.sent("kill 0x10"));

        wm.conn.with_window(0x10, |w| w.delete = true);
        wm.conn.clear_requests();
        wm.handle_key_press(key(&wm, escape, CTRL_ALT, 0)).unwrap();
        assert!(wm.conn.sent("delete 0x10"));

        wm.conn.clear_requests();
        wm.handle_key_press(key(&wm, escape, CTRL_ALT | SHIFT, 0)).unwrap();
        assert!(wm.conn.sent("kill 0x10"));
    }

    #[test]
    fn client_bindings_need_a_client() {
        let mut wm = wm();
        wm.handle_key_press(key(&wm, 'n' as Keysym, CTRL_ALT, 0)).unwrap();
        assert!(wm.conn.requests().is_empty());

        // Unbound chords do nothing either
        wm.handle_key_press(key(&wm, 'q' as Keysym, CTRL_ALT, 0)).unwrap();
        assert!(wm.conn.requests().is_empty());
    }

    #[test]
    fn vdesk_and_fix_bindings() {
        let mut wm = wm();
        let id = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));

        wm.handle_key_press(key(&wm, 'f' as Keysym, CTRL_ALT, 0)).unwrap();
        assert!(wm.clients.get(id).unwrap().is_fixed());

        wm.handle_key_press(key(&wm, '3' as Keysym, CTRL_ALT, 0)).unwrap();
        assert_eq!(wm.screens[0].vdesk, Vdesk::Desk(2));
        assert!(wm.is_visible(id));

        // Unfixing puts it on the current desktop
        wm.handle_key_press(key(&wm, 'f' as Keysym, CTRL_ALT, 0)).unwrap();
        assert_eq!(wm.clients.get(id).unwrap().vdesk, Vdesk::Desk(2));

        wm.handle_key_press(key(&wm, 'a' as Keysym, CTRL_ALT, 0)).unwrap();
        assert_eq!(wm.screens[0].vdesk, Vdesk::Desk(0));
        assert!(!wm.is_visible(id));
    }

    #[test]
    fn binds_can_be_set_aside() {
        let mut wm = wm();
        manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let multi = 0xff20;

        wm.handle_key_press(key(&wm, multi, CTRL_ALT, 0)).unwrap();
        assert!(wm.binds.is_stashed());
        assert!(wm.conn.sent("ungrab_button 0x101 1 0x8"));

        // Only the toggle is left
        wm.conn.clear_requests();
        wm.handle_key_press(key(&wm, 'l' as Keysym, CTRL_ALT, 0)).unwrap();
        assert!(wm.conn.requests().is_empty());

        wm.handle_key_press(key(&wm, multi, CTRL_ALT, 0)).unwrap();
        assert!(!wm.binds.is_stashed());
        assert!(wm.conn.sent("grab_button 0x101 1 0x8"));
    }

    #[test]
    fn button_press_falls_back_to_mask2() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let b = manage(&mut wm, 0x11, Rectangle::new(50, 50, 100, 100));

        // Lower is bound to mask2+button3; a plain button3 still finds it
        wm.handle_button_press(button(0x102, 3, 0, Point::new(60, 60))).unwrap();
        assert_eq!(wm.clients.stacking_order(), &[b, a]);
        assert!(matches!(wm.mode, Mode::Idle));

        wm.handle_button_press(button(0x101, 1, ALT, Point::new(5, 5))).unwrap();
        assert!(matches!(wm.mode, Mode::Dragging(_)));
        assert!(wm.conn.sent("grab_pointer Move"));
        assert_eq!(wm.clients.stacking_order(), &[b, a]);
    }

    #[test]
    fn info_banner_shows_title_and_geometry() {
        let mut wm = wm();
        manage(&mut wm, 0x10, Rectangle::new(20, 30, 200, 100));

        wm.handle_key_press(key(&wm, 'i' as Keysym, CTRL_ALT, 0)).unwrap();
        assert!(wm.conn.sent("grab_keyboard"));
        assert!(wm.conn.sent("info 0x102 142 30 80 26 test|200x100+21+31"));
        assert!(matches!(wm.mode, Mode::Info { banner: Some(0x102), .. }));
    }
}
