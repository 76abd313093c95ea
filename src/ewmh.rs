//! Hints published for pagers and clients: client lists, desktops, allowed
//! actions and `_NET_WM_STATE`

use crate::{
    client::{Client, ClientId},
    manager::WindowManager,
    x::{
        property::{AllowedAction, NetWmState},
        Window,
        XConn,
    },
};
use anyhow::Result;

/// The `_NET_WM_STATE` atoms describing a client
pub(crate) fn net_wm_states(c: &Client, focused: bool, visible: bool) -> Vec<NetWmState> {
    let mut states = vec![];

    if c.saved_vert.is_some() {
        states.push(NetWmState::MaximizedVert);
    }
    if c.saved_horz.is_some() {
        states.push(NetWmState::MaximizedHorz);
    }
    if c.is_maximised_both() {
        states.push(NetWmState::Fullscreen);
    }
    if !visible {
        states.push(NetWmState::Hidden);
    }
    // Docks always report focus so that panels do not dim themselves
    if focused || c.is_dock {
        states.push(NetWmState::Focused);
    }

    states
}

/// The `_NET_WM_ALLOWED_ACTIONS` of a client. Fixed-size clients cannot be
/// resized.
pub(crate) fn allowed_actions(c: &Client) -> Vec<AllowedAction> {
    let mut actions = vec![AllowedAction::Move];
    if !c.hints.is_fixed_size() {
        actions.push(AllowedAction::Resize);
    }
    actions.extend([
        AllowedAction::MaximizeHorz,
        AllowedAction::MaximizeVert,
        AllowedAction::Fullscreen,
        AllowedAction::ChangeDesktop,
        AllowedAction::Close,
    ]);
    actions
}

impl<X: XConn> WindowManager<X> {
    /// Publish what may be done with a client, then its state
    pub(crate) fn set_allowed_actions(&mut self, id: ClientId) -> Result<()> {
        if let Some(c) = self.clients.get(id) {
            self.conn.set_allowed_actions(c.window, &allowed_actions(c))?;
        }
        self.update_net_wm_state(id)
    }

    /// Publish a client's `_NET_WM_STATE`. `_NET_ACTIVE_WINDOW` on its root
    /// follows along when the client gains or loses focus.
    pub(crate) fn update_net_wm_state(&mut self, id: ClientId) -> Result<()> {
        let focused = self.current == Some(id);
        let visible = self.is_visible(id);
        let Some(c) = self.clients.get(id) else {
            return Ok(());
        };

        self.conn.set_net_wm_state(c.window, &net_wm_states(c, focused, visible))?;

        let screen = &mut self.screens[c.screen];
        if focused && screen.active != Some(c.window) {
            screen.active = Some(c.window);
            self.conn.set_active_window(screen.root, Some(c.window))?;
        } else if !focused && screen.active == Some(c.window) {
            screen.active = None;
            self.conn.set_active_window(screen.root, None)?;
        }

        Ok(())
    }

    /// Publish a client's desktop
    pub(crate) fn publish_desktop(&self, id: ClientId) -> Result<()> {
        match self.clients.get(id) {
            Some(c) => self.conn.set_wm_desktop(c.window, c.vdesk.to_cardinal()),
            None => Ok(()),
        }
    }

    /// Windows of `screen`'s clients, in the order of `ids`
    fn windows_on(&self, screen: usize, ids: &[ClientId]) -> Vec<Window> {
        ids.iter()
            .filter_map(|&id| self.clients.get(id))
            .filter(|c| c.screen == screen)
            .map(|c| c.window)
            .collect()
    }

    /// Publish `_NET_CLIENT_LIST` (mapping order) on every root
    pub(crate) fn publish_client_list(&self) -> Result<()> {
        for screen in &self.screens {
            let windows = self.windows_on(screen.number, self.clients.mapping_order());
            self.conn.set_client_list(screen.root, &windows)?;
        }
        Ok(())
    }

    /// Publish `_NET_CLIENT_LIST_STACKING` (bottom to top) on every root
    pub(crate) fn publish_stacking(&self) -> Result<()> {
        for screen in &self.screens {
            let windows = self.windows_on(screen.number, self.clients.stacking_order());
            self.conn.set_client_list_stacking(screen.root, &windows)?;
        }
        Ok(())
    }

    pub(crate) fn publish_current_desktop(&self, screen: usize) -> Result<()> {
        let s = &self.screens[screen];
        self.conn.set_current_desktop(s.root, s.vdesk.to_cardinal())
    }

    pub(crate) fn publish_desktop_geometry(&self, screen: usize) -> Result<()> {
        let s = &self.screens[screen];
        self.conn.set_desktop_geometry(s.root, s.width, s.height)
    }

    /// Everything a screen's root carries
    pub(crate) fn publish_root_hints(&self, screen: usize) -> Result<()> {
        let s = &self.screens[screen];

        self.conn.set_supported(s.root)?;
        self.conn.set_number_of_desktops(s.root, self.settings.vdesks)?;
        self.publish_current_desktop(screen)?;
        if let Some(check) = s.supporting {
            self.conn.set_supporting_wm_check(s.root, check)?;
        }
        self.publish_desktop_geometry(screen)?;
        self.publish_client_list()?;
        self.publish_stacking()
    }
}
