//! The window manager context.
//!
//! [`WindowManager`] owns everything: the connection, the screens, the client
//! registry and the binding table. Every operation is a method on it, spread
//! over the modules that deal with one concern each (`stack`, `vdesk`, `ewmh`,
//! `actions`, `events`).

use crate::{
    bind::{BindTable, ModifierGroups},
    client::{Client, ClientId, ClientRegistry, Vdesk},
    config::{AppRule, Config, GlobalSettings},
    error::Error,
    events::Mode,
    geometry::Rectangle,
    placement::{self, MaximiseAction},
    screen::{BorderColors, Screen},
    x::{
        event::XEvent,
        property::{default_constraints, Axis, IcccmWindowState, WindowType},
        Window,
        WindowAttributes,
        XConn,
    },
};
use anyhow::{Context, Result};
use itertools::Itertools;
use std::collections::VecDeque;

// ============================ WindowManager ============================= [[[

/// The single context every operation runs against
pub(crate) struct WindowManager<X: XConn> {
    pub(crate) conn:         X,
    pub(crate) settings:     GlobalSettings,
    pub(crate) screens:      Vec<Screen>,
    pub(crate) clients:      ClientRegistry,
    /// The focused client
    pub(crate) current:      Option<ClientId>,
    pub(crate) binds:        BindTable,
    pub(crate) rules:        Vec<AppRule>,
    /// Modifier bit num-lock is on
    pub(crate) numlock:      u16,
    /// Interactive operation in progress
    pub(crate) mode:         Mode,
    /// Events put back to be handled before reading from the server again
    pub(crate) pending:      VecDeque<XEvent>,
    /// Events that arrived during an interactive operation
    pub(crate) deferred:     VecDeque<XEvent>,
    /// Window being managed; errors about it are expected
    pub(crate) initialising: Option<Window>,
    /// Window and frame being released; errors about them are expected
    pub(crate) removing:     Option<(Window, Window)>,
    /// Server time of the last keyboard move
    pub(crate) last_kbmove:  Option<u32>,
    /// Some client is marked for removal
    pub(crate) need_tidy:    bool,
}

impl<X: XConn> WindowManager<X> {
    /// Create a new [`WindowManager`]. Nothing is requested from the server
    /// until [`start`](Self::start).
    pub(crate) fn new(conn: X, config: &Config) -> Result<Self> {
        let screens = conn
            .screens()
            .iter()
            .enumerate()
            .map(|(idx, info)| Screen::new(idx, info.root, info.width, info.height))
            .collect::<Vec<_>>();
        let numlock = conn.numlock_mask().context("failed to find the num-lock modifier")?;

        let mut wm = Self {
            conn,
            settings: config.global.clone(),
            screens,
            clients: ClientRegistry::new(),
            current: None,
            binds: BindTable::default(),
            rules: vec![],
            numlock,
            mode: Mode::Idle,
            pending: VecDeque::new(),
            deferred: VecDeque::new(),
            initialising: None,
            removing: None,
            last_kbmove: None,
            need_tidy: false,
        };
        wm.configure(config)?;

        Ok(wm)
    }

    /// Take the settings, bindings and rules from `config`
    fn configure(&mut self, config: &Config) -> Result<()> {
        self.settings = config.global.clone();

        let mut groups = ModifierGroups::default();
        groups.set("mask1", &self.settings.mask1)?;
        groups.set("mask2", &self.settings.mask2)?;
        groups.set("altmask", &self.settings.altmask)?;

        self.binds = BindTable::new(groups);
        for (ctl, func) in config.binding_list() {
            if let Err(e) = self.binds.apply(&ctl, &func) {
                log::warn!("dropping binding: {}", e);
            }
        }
        log::debug!("{} bindings active", self.binds.binds().len());

        self.rules = config.applications.clone();
        Ok(())
    }

    /// Allocate the three border colors of a screen
    fn alloc_colors(&self, idx: usize) -> Result<BorderColors> {
        let colormap = self.conn.screens().get(idx).map_or(0, |s| s.colormap);
        let alloc = |name: &str| {
            self.conn
                .alloc_color(colormap, name)
                .with_context(|| format!("failed to allocate color '{}'", name))
        };

        Ok(BorderColors {
            active:   alloc(&self.settings.fg)?,
            inactive: alloc(&self.settings.bg)?,
            fixed:    alloc(&self.settings.fc)?,
        })
    }

    /// Take over every screen: redirect its root, grab the bindings, manage
    /// the windows already there and publish the root hints
    pub(crate) fn start(&mut self) -> Result<()> {
        for idx in 0..self.screens.len() {
            let root = self.screens[idx].root;
            log::info!("taking over screen {} (root Window({:#0x}))", idx, root);

            self.conn.become_wm(root, idx)?;
            let monitors = self.conn.monitors(root)?;
            self.screens[idx].set_monitors(monitors);
            self.screens[idx].colors = self.alloc_colors(idx)?;
            self.screens[idx].docks_visible = self.settings.docks;

            self.grab_for_screen(idx)?;
            self.manage_initial_windows(idx)?;

            let check = self.conn.create_supporting_window(root)?;
            self.screens[idx].supporting = Some(check);
            self.publish_root_hints(idx)?;
        }

        self.conn.flush();
        Ok(())
    }

    /// Manage every viewable, non override-redirect child of a screen's root
    pub(crate) fn manage_initial_windows(&mut self, screen: usize) -> Result<()> {
        let root = self.screens[screen].root;

        for window in self.conn.query_tree(root)? {
            match self.conn.window_attributes(window) {
                Ok(attrs) if !attrs.override_redirect && attrs.viewable => {
                    self.manage(window, screen)?;
                },
                Ok(_) => {},
                Err(e) => log::debug!("skipping Window({:#0x}): {}", window, e),
            }
        }

        Ok(())
    }

    /// Release every client and re-read the configuration. The clients are
    /// then managed again and focus goes back where it was.
    pub(crate) fn reload(&mut self, config: &Config) -> Result<()> {
        log::info!("reloading configuration");
        let focused = self.current.and_then(|id| self.clients.get(id)).map(|c| c.window);

        self.unmanage_all()?;
        self.configure(config)?;

        for idx in 0..self.screens.len() {
            self.screens[idx].colors = self.alloc_colors(idx)?;
            self.grab_for_screen(idx)?;
            self.manage_initial_windows(idx)?;
            self.publish_root_hints(idx)?;
        }

        if let Some(id) = focused.and_then(|w| self.clients.find(w)) {
            self.select(Some(id))?;
        }

        self.conn.flush();
        Ok(())
    }

    /// Release all clients without withdrawing them
    pub(crate) fn unmanage_all(&mut self) -> Result<()> {
        let ids = self.clients.mapping_order().to_vec();
        for id in ids {
            self.remove(id)?;
        }
        Ok(())
    }

    /// Hand the display back: clients are released, grabs and root hints
    /// removed
    pub(crate) fn shutdown(&mut self) -> Result<()> {
        log::info!("shutting down");
        self.unmanage_all()?;

        for idx in 0..self.screens.len() {
            let root = self.screens[idx].root;
            self.conn.ungrab_all_keys(root)?;
            self.conn.ungrab_all_buttons(root)?;
            self.conn.clear_root_hints(root)?;
            if let Some(check) = self.screens[idx].supporting.take() {
                self.conn.destroy(check)?;
            }
        }

        self.conn.focus_pointer_root()?;
        self.conn.sync();
        Ok(())
    }

    /// Last resort after a panic: drop any grab that could lock the display,
    /// then shut down normally
    pub(crate) fn emergency_cleanup(&mut self) {
        let _ungrabbed = self.conn.ungrab_pointer().and_then(|_| self.conn.ungrab_server());
        if let Err(e) = self.shutdown() {
            log::error!("cleanup failed: {:#}", e);
        }
    }
}

// ]]] === WindowManager ===

// ============================== Managing ================================ [[[

impl<X: XConn> WindowManager<X> {
    /// Start managing `window` on `screen`. Returns `None` if the window
    /// vanished or is a desktop window, which is mapped and left alone.
    pub(crate) fn manage(&mut self, window: Window, screen: usize) -> Result<Option<ClientId>> {
        log::debug!("managing Window({:#0x})", window);
        self.initialising = Some(window);

        let attrs = match self.conn.window_attributes(window) {
            Ok(attrs) => attrs,
            Err(e) => {
                log::debug!("{}: {}", Error::ManageFailed { window }, e);
                return Ok(None);
            },
        };

        let types = self.conn.window_types(window);
        if types.contains(WindowType::DESKTOP) {
            log::debug!("Window({:#0x}) is a desktop window, mapping it unmanaged", window);
            self.conn.map(window)?;
            return Ok(None);
        }

        let title = self.conn.window_name(window);
        let class = self.conn.window_class(window);

        let mut client = Client::new(window, screen, self.screens[screen].vdesk);
        client.is_dock = types.contains(WindowType::DOCK);
        self.init_geometry(&mut client, &attrs)?;

        let id = self.clients.insert(client);
        self.conn.select_client_input(window)?;
        self.reparent(id)?;
        self.apply_rules(id, title.as_deref(), class)?;

        self.set_allowed_actions(id)?;
        self.publish_client_list()?;
        self.publish_stacking()?;

        if self.is_visible(id) {
            self.show(id)?;
            let root = self.screens[screen].root;
            let pointer_here = self.conn.query_pointer(window).map_or(false, |p| p.root == root);
            if pointer_here && !types.intersects(WindowType::DOCK | WindowType::NOTIFICATION) {
                self.select(Some(id))?;
            }
        } else {
            self.hide(id)?;
        }

        self.publish_desktop(id)?;
        Ok(Some(id))
    }

    /// Read the hints that decide where a new client goes and how big it is
    fn init_geometry(&self, c: &mut Client, attrs: &WindowAttributes) -> Result<()> {
        let window = c.window;
        let screen = &self.screens[c.screen];
        let dims = (screen.width, screen.height);

        c.normal_border = if self.conn.motif_hints(window).map_or(false, |m| m.disables_border()) {
            0
        } else {
            self.settings.border_width
        };

        if let Some(desktop) = self.conn.window_desktop(window) {
            let vdesk = Vdesk::from_cardinal(desktop);
            if vdesk.is_valid(self.settings.vdesks) {
                c.vdesk = vdesk;
            }
        }

        c.old_border = attrs.border;
        c.colormap = attrs.colormap;

        c.saved_horz = self.conn.unmaximised(window, Axis::Horizontal);
        c.saved_vert = self.conn.unmaximised(window, Axis::Vertical);
        c.border = if c.is_maximised_both() { 0 } else { c.normal_border };

        let hints = self.conn.size_hints(window);
        let (constraints, gravity) = hints.map_or_else(default_constraints, |h| h.constraints());
        c.hints = constraints;
        c.gravity_hint = gravity;
        c.gravity = gravity;

        let mut need_config = false;
        if attrs.rect.width >= c.hints.min_width && attrs.rect.height >= c.hints.min_height {
            c.rect.width = attrs.rect.width;
            c.rect.height = attrs.rect.height;
        } else {
            c.rect.width = c.hints.min_width;
            c.rect.height = c.hints.min_height;
            need_config = true;
        }

        if attrs.viewable || hints.map_or(false, |h| h.user_position()) {
            c.rect.x = attrs.rect.x;
            c.rect.y = attrs.rect.y;
        } else {
            let pointer = self.conn.query_pointer(screen.root)?.pos;
            c.rect.x = placement::pointer_relative(pointer.x, dims.0, c.rect.width, c.border);
            c.rect.y = placement::pointer_relative(pointer.y, dims.1, c.rect.height, c.border);
            need_config = true;
        }

        if need_config {
            self.conn.send_configure_notify(window, c.rect)?;
        }
        self.conn.set_frame_extents(window, c.border)?;

        // Reparenting a viewable window unmaps it once
        if attrs.viewable {
            c.ignore_unmap += 1;
        }

        c.rect.x += c.old_border;
        c.rect.y += c.old_border;
        c.gravitate(-c.old_border, dims);
        c.gravitate(c.border, dims);

        Ok(())
    }

    /// Create the frame for a client and move the client into it
    fn reparent(&mut self, id: ClientId) -> Result<()> {
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };
        let screen = &self.screens[c.screen];
        let (x, y) = c.frame_origin();
        let window = c.window;

        let parent = self.conn.create_frame(
            screen.root,
            Rectangle::new(x, y, c.rect.width, c.rect.height),
            c.border,
            screen.colors.inactive,
        )?;
        log::trace!("created frame Window({:#0x}) for Window({:#0x})", parent, window);

        if let Some(c) = self.clients.get_mut(id) {
            c.parent = parent;
        }

        self.conn.add_to_save_set(window)?;
        self.conn.set_border_width(window, 0)?;
        self.conn.reparent(window, parent, 0, 0)?;
        self.conn.map(window)?;
        self.conn.copy_shape(parent, window)?;
        self.grab_for_client(id)
    }

    /// Apply every matching application rule
    fn apply_rules(
        &mut self,
        id: ClientId,
        title: Option<&str>,
        class: Option<(String, String)>,
    ) -> Result<()> {
        let (instance, class) = class.map_or((None, None), |(i, c)| (Some(i), Some(c)));
        let matching = self
            .rules
            .iter()
            .filter(|r| r.matches(instance.as_deref(), class.as_deref(), title))
            .cloned()
            .collect::<Vec<_>>();

        for rule in matching {
            let Some(c) = self.clients.get_mut(id) else {
                return Ok(());
            };
            log::debug!(
                "application rule {:?}/{:?}/{:?} matches Window({:#0x})",
                rule.name,
                rule.class,
                rule.title,
                c.window
            );
            let screen = &self.screens[c.screen];

            if let Some(geom) = rule.parsed_geometry() {
                if let Some((w, h)) = geom.size {
                    c.rect.width = w * c.hints.width_inc;
                    c.rect.height = h * c.hints.height_inc;
                }
                if let Some(((x, x_neg), (y, y_neg))) = geom.position {
                    c.rect.x = if x_neg {
                        x + screen.width - c.rect.width - c.border
                    } else {
                        x + c.border
                    };
                    c.rect.y = if y_neg {
                        y + screen.height - c.rect.height - c.border
                    } else {
                        y + c.border
                    };
                }
            }

            c.manual |= rule.manual;
            c.is_dock |= rule.dock;
            match rule.target_vdesk() {
                Some(v) if v.is_valid(self.settings.vdesks) => c.vdesk = v,
                Some(v) => log::warn!("application rule names desktop {} which does not exist", v),
                None => {},
            }

            self.moveresize(id)?;
        }

        Ok(())
    }

    /// Stop managing a client. A client marked for removal is withdrawn;
    /// otherwise it is handed back as it was (on shutdown or reload).
    pub(crate) fn remove(&mut self, id: ClientId) -> Result<()> {
        // Forget the client first so a failed request cannot leave it half removed
        let Some(mut c) = self.clients.remove(id) else {
            return Ok(());
        };
        debug_assert!(self.clients.is_consistent());
        log::debug!("removing Window({:#0x})", c.window);
        self.removing = Some((c.window, c.parent));

        let was_current = self.current == Some(id);
        let screen = &mut self.screens[c.screen];
        let (root, dims) = (screen.root, (screen.width, screen.height));
        let was_active = was_current && screen.active == Some(c.window);
        if was_current {
            self.current = None;
        }
        if was_active {
            screen.active = None;
        }

        if c.remove {
            if was_current {
                self.conn.focus_pointer_root()?;
            }
            self.conn.set_wm_state(c.window, IcccmWindowState::Withdrawn)?;
            self.conn.delete_client_hints(c.window)?;
        } else {
            self.conn.delete_allowed_actions(c.window)?;
        }

        c.gravitate(-c.border, dims);
        c.gravitate(c.old_border, dims);
        c.rect.x -= c.old_border;
        c.rect.y -= c.old_border;

        self.conn.reparent(c.window, root, c.rect.x, c.rect.y)?;
        self.conn.set_border_width(c.window, c.old_border)?;
        self.conn.remove_from_save_set(c.window)?;
        self.conn.destroy(c.parent)?;

        if c.remove {
            self.publish_client_list()?;
            self.publish_stacking()?;
        }

        if was_active {
            self.conn.set_active_window(root, None)?;
        }

        Ok(())
    }

    /// Unmap a client's frame, e.g. when it is on another desktop
    pub(crate) fn hide(&mut self, id: ClientId) -> Result<()> {
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let (parent, window) = (c.parent, c.window);

        // An unmapped frame sends no further notification to count down
        if c.mapped {
            c.mapped = false;
            c.ignore_unmap += 1;
            log::trace!("hiding Window({:#0x})", window);
            self.conn.unmap(parent)?;
        }
        self.conn.set_wm_state(window, IcccmWindowState::Iconic)?;

        if self.current == Some(id) {
            self.select(None)?;
        }
        self.update_net_wm_state(id)
    }

    pub(crate) fn show(&mut self, id: ClientId) -> Result<()> {
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };
        c.mapped = true;
        let (parent, window) = (c.parent, c.window);

        log::trace!("showing Window({:#0x})", window);
        self.conn.map(parent)?;
        self.conn.set_wm_state(window, IcccmWindowState::Normal)?;
        self.update_net_wm_state(id)
    }

    /// Give a client the focus, or with `None` leave nothing focused
    pub(crate) fn select(&mut self, id: Option<ClientId>) -> Result<()> {
        let old = self.current;

        if let Some(c) = old.and_then(|o| self.clients.get(o)) {
            self.conn.set_border_color(c.parent, self.screens[c.screen].colors.inactive)?;
        }

        let id = id.filter(|&i| self.clients.get(i).is_some());
        if let Some(c) = id.and_then(|i| self.clients.get(i)) {
            log::debug!("focusing Window({:#0x})", c.window);
            let colors = self.screens[c.screen].colors;
            let pixel = if c.is_fixed() { colors.fixed } else { colors.active };

            self.conn.set_border_color(c.parent, pixel)?;
            self.conn.install_colormap(c.colormap)?;
            self.conn.focus(c.window)?;
        }

        self.current = id;

        for changed in old.into_iter().chain(id).unique() {
            self.update_net_wm_state(changed)?;
        }
        Ok(())
    }

    /// Whether a client shows on its screen's current desktop
    pub(crate) fn is_visible(&self, id: ClientId) -> bool {
        self.clients
            .get(id)
            .map_or(false, |c| c.is_visible_on(self.screens[c.screen].vdesk))
    }

    /// Push a client's geometry to its frame and window
    pub(crate) fn moveresize(&self, id: ClientId) -> Result<()> {
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };
        let (x, y) = c.frame_origin();

        self.conn
            .move_resize(c.parent, Rectangle::new(x, y, c.rect.width, c.rect.height))?;
        self.conn
            .move_resize(c.window, Rectangle::new(0, 0, c.rect.width, c.rect.height))?;
        self.send_config(id)
    }

    pub(crate) fn moveresize_raise(&mut self, id: ClientId) -> Result<()> {
        self.raise(id)?;
        self.moveresize(id)
    }

    /// Tell a client where it is with a synthetic `ConfigureNotify`
    pub(crate) fn send_config(&self, id: ClientId) -> Result<()> {
        match self.clients.get(id) {
            Some(c) => self.conn.send_configure_notify(c.window, c.rect),
            None => Ok(()),
        }
    }
}

// ]]] === Managing ===

// ============================== Geometry ================================ [[[

impl<X: XConn> WindowManager<X> {
    /// The monitor a client is on, and whether it actually intersects it
    pub(crate) fn client_monitor(&self, id: ClientId) -> Option<(Rectangle, bool)> {
        let c = self.clients.get(id)?;
        let screen = &self.screens[c.screen];
        let (idx, intersects) =
            placement::closest_monitor(&c.bordered(), &screen.monitors, c.mon_name.as_deref());

        Some((screen.monitor(idx).rect, intersects))
    }

    /// Drag a client that lies entirely off every monitor back to the edge of
    /// the closest one
    pub(crate) fn intersect(&mut self, id: ClientId) -> Result<()> {
        let Some((mon, intersects)) = self.client_monitor(id) else {
            return Ok(());
        };
        if intersects {
            return Ok(());
        }

        if let Some(c) = self.clients.get_mut(id) {
            c.rect = placement::pull_onto_monitor(&c.rect, &mon);
            log::debug!("pulled Window({:#0x}) back to {}", c.window, c.rect);
        }
        self.moveresize(id)
    }

    /// Maximise or restore a client along the chosen axes. The target is
    /// its monitor, or the whole screen with `wholescreen`.
    pub(crate) fn maximise(
        &mut self,
        id: ClientId,
        action: MaximiseAction,
        horz: bool,
        vert: bool,
    ) -> Result<()> {
        let target = if self.settings.wholescreen {
            self.clients.get(id).map(|c| self.screens[c.screen].rect())
        } else {
            self.client_monitor(id).map(|(mon, _)| mon)
        };
        let (Some(target), Some(c)) = (target, self.clients.get_mut(id)) else {
            return Ok(());
        };

        if horz {
            let mut span = (c.rect.x, c.rect.width);
            if placement::maximise_axis(&mut span, &mut c.saved_horz, (target.x, target.width), action) {
                (c.rect.x, c.rect.width) = span;
                self.conn.set_unmaximised(c.window, Axis::Horizontal, c.saved_horz)?;
            }
        }
        if vert {
            let mut span = (c.rect.y, c.rect.height);
            if placement::maximise_axis(&mut span, &mut c.saved_vert, (target.y, target.height), action) {
                (c.rect.y, c.rect.height) = span;
                self.conn.set_unmaximised(c.window, Axis::Vertical, c.saved_vert)?;
            }
        }

        let border = if c.is_maximised_both() { 0 } else { c.normal_border };
        if border != c.border {
            c.border = border;
            self.conn.set_border_width(c.parent, border)?;
            self.conn.set_frame_extents(c.window, border)?;
        }

        self.update_net_wm_state(id)?;
        self.moveresize_raise(id)
    }

    /// Focus the next visible client in tab order, wrapping around
    pub(crate) fn select_next(&mut self) -> Result<()> {
        let order = self.clients.tab_order();
        let after = self
            .current
            .and_then(|cur| order.iter().position(|&c| c == cur))
            .map_or(0, |pos| pos + 1);

        let next = order[after..]
            .iter()
            .chain(order.iter())
            .copied()
            .find(|&c| self.is_visible(c));

        let Some(next) = next else {
            return Ok(());
        };

        self.raise(next)?;
        self.intersect(next)?;
        self.select(Some(next))
    }

    /// Remember the monitor each client is on, before the monitors change
    pub(crate) fn note_client_monitors(&mut self, screen: usize) {
        let ids = self.clients.tab_order().to_vec();
        for id in ids {
            let name = self
                .clients
                .get(id)
                .filter(|c| c.screen == screen)
                .and_then(|_| self.client_monitor(id))
                .and_then(|(mon, _)| {
                    self.screens[screen]
                        .monitors
                        .iter()
                        .find(|m| m.rect == mon)
                        .and_then(|m| m.name.clone())
                });
            if let Some(c) = self.clients.get_mut(id).filter(|c| c.screen == screen) {
                c.mon_name = name;
            }
        }
    }

    /// Rescale every client of a screen whose size changed from `old`.
    /// Maximised axes keep filling the screen.
    pub(crate) fn fix_screen_after_resize(&mut self, screen: usize, old: (i32, i32)) -> Result<()> {
        let (new_w, new_h) = (self.screens[screen].width, self.screens[screen].height);
        let ids = self
            .clients
            .iter()
            .filter(|(_, c)| c.screen == screen)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();

        for id in ids {
            if let Some(c) = self.clients.get_mut(id) {
                let b = c.border;
                match c.saved_horz {
                    Some((ox, ow)) => {
                        c.rect.width = new_w;
                        c.saved_horz = Some((placement::scale_pos(new_w, old.0, ox, ow + b), ow));
                        self.conn.set_unmaximised(c.window, Axis::Horizontal, c.saved_horz)?;
                    },
                    None => c.rect.x = placement::scale_pos(new_w, old.0, c.rect.x, c.rect.width + b),
                }
                match c.saved_vert {
                    Some((oy, oh)) => {
                        c.rect.height = new_h;
                        c.saved_vert = Some((placement::scale_pos(new_h, old.1, oy, oh + b), oh));
                        self.conn.set_unmaximised(c.window, Axis::Vertical, c.saved_vert)?;
                    },
                    None => c.rect.y = placement::scale_pos(new_h, old.1, c.rect.y, c.rect.height + b),
                }
            }
            self.moveresize(id)?;
            self.intersect(id)?;
        }

        Ok(())
    }

    /// Keep a client's size within its hints, e.g. after they changed
    pub(crate) fn reclamp(&mut self, id: ClientId) -> Result<()> {
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let width = c.hints.clamp_width(c.rect.width);
        let height = c.hints.clamp_height(c.rect.height);

        if (width, height) != (c.rect.width, c.rect.height) {
            c.rect.width = width;
            c.rect.height = height;
            self.moveresize(id)?;
        }
        Ok(())
    }
}

// ]]] === Geometry ===
