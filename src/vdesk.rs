//! Virtual desktops: switching between them, moving clients across and
//! showing or hiding docks

use crate::{
    bind::BindFlags,
    client::{ClientId, Vdesk},
    manager::WindowManager,
    x::XConn,
};
use anyhow::Result;

/// Desktop reached by a relative switch from `current`.
///
/// Desktops are laid out in rows of `per_row` (all in one row for 0); `UP`
/// and `DOWN` move within a row, `LEFT` and `RIGHT` between rows, both
/// wrapping around.
pub(crate) fn relative_vdesk(current: u32, count: u32, per_row: u32, flags: BindFlags) -> u32 {
    let per_row = if per_row == 0 { count } else { per_row }.max(1);
    let rows = (count / per_row).max(1);

    let mut v = current % per_row;
    let mut h = current / per_row;

    if flags.contains(BindFlags::UP) {
        v += 1;
    } else if flags.contains(BindFlags::DOWN) {
        v += per_row - 1;
    }
    if flags.contains(BindFlags::RIGHT) {
        h += 1;
    } else if flags.contains(BindFlags::LEFT) {
        h += rows - 1;
    }

    (h % rows) * per_row + v % per_row
}

impl<X: XConn> WindowManager<X> {
    /// Move a client to another desktop (or make it fixed), showing or
    /// hiding it as needed
    pub(crate) fn client_to_vdesk(&mut self, id: ClientId, vdesk: Vdesk) -> Result<()> {
        if !vdesk.is_valid(self.settings.vdesks) {
            log::debug!("ignoring move to desktop {}", vdesk);
            return Ok(());
        }

        let was_visible = self.is_visible(id);
        let Some(c) = self.clients.get_mut(id) else {
            return Ok(());
        };
        log::debug!("moving Window({:#0x}) to desktop {}", c.window, vdesk);
        c.vdesk = vdesk;

        match (was_visible, self.is_visible(id)) {
            (false, true) => self.show(id)?,
            (true, false) => self.hide(id)?,
            _ => self.update_net_wm_state(id)?,
        }

        // The border color depends on whether the client is fixed
        if self.current == Some(id) {
            self.select(Some(id))?;
        }

        self.publish_desktop(id)
    }

    /// Make `vdesk` the current desktop of a screen
    pub(crate) fn switch_vdesk(&mut self, screen: usize, vdesk: Vdesk) -> Result<()> {
        let old = self.screens[screen].vdesk;
        if vdesk == old || !vdesk.is_valid(self.settings.vdesks) {
            return Ok(());
        }
        log::debug!("switching screen {} from desktop {} to {}", screen, old, vdesk);

        if let Some(cur) = self.current {
            if self.clients.get(cur).map_or(false, |c| !c.is_fixed()) {
                self.select(None)?;
            }
        }

        let docks_visible = self.screens[screen].docks_visible;
        let affected = self
            .clients
            .iter()
            .filter(|(_, c)| c.screen == screen && !c.is_fixed())
            .map(|(id, c)| (id, c.vdesk, c.is_dock))
            .collect::<Vec<_>>();

        for (id, desk, is_dock) in affected {
            if desk == old {
                self.hide(id)?;
            } else if desk == vdesk && (!is_dock || docks_visible) {
                self.show(id)?;
            }
        }

        let s = &mut self.screens[screen];
        s.old_vdesk = old;
        s.vdesk = vdesk;
        self.publish_current_desktop(screen)
    }

    /// Switch desktops as a binding asks: back to the previous one, to a
    /// numbered one (255 meaning fixed) or relative to the current one
    pub(crate) fn vdesk_from_flags(&self, screen: usize, flags: BindFlags) -> Vdesk {
        let s = &self.screens[screen];

        if flags.contains(BindFlags::TOGGLE) {
            return s.old_vdesk;
        }
        if !flags.contains(BindFlags::RELATIVE) {
            return match flags.value() {
                0xff => Vdesk::Fixed,
                n => Vdesk::Desk(n),
            };
        }

        let current = match (s.vdesk, s.old_vdesk) {
            (Vdesk::Desk(n), _) | (Vdesk::Fixed, Vdesk::Desk(n)) => n,
            (Vdesk::Fixed, Vdesk::Fixed) => 0,
        };
        Vdesk::Desk(relative_vdesk(current, self.settings.vdesks, self.settings.modvdesks, flags))
    }

    /// Show or hide the docks of a screen
    pub(crate) fn set_docks_visible(&mut self, screen: usize, visible: bool) -> Result<()> {
        log::debug!("{} docks on screen {}", if visible { "showing" } else { "hiding" }, screen);
        self.screens[screen].docks_visible = visible;

        let vdesk = self.screens[screen].vdesk;
        let docks = self
            .clients
            .iter()
            .filter(|(_, c)| c.screen == screen && c.is_dock)
            .map(|(id, c)| (id, c.is_visible_on(vdesk)))
            .collect::<Vec<_>>();

        for (id, on_desktop) in docks {
            if !visible {
                self.hide(id)?;
            } else if on_desktop {
                self.show(id)?;
                self.raise(id)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::Rectangle,
        manager::tests::{manage, wm},
        x::{event::XEvent, property::IcccmWindowState},
    };

    #[test]
    fn relative_switching_wraps() {
        let up = BindFlags::RELATIVE | BindFlags::UP;
        let down = BindFlags::RELATIVE | BindFlags::DOWN;
        let right = BindFlags::RELATIVE | BindFlags::RIGHT;
        let left = BindFlags::RELATIVE | BindFlags::LEFT;

        // One row of eight
        assert_eq!(relative_vdesk(0, 8, 0, up), 1);
        assert_eq!(relative_vdesk(7, 8, 0, up), 0);
        assert_eq!(relative_vdesk(0, 8, 0, down), 7);
        assert_eq!(relative_vdesk(3, 8, 0, right), 3);

        // Two rows of four
        assert_eq!(relative_vdesk(1, 8, 4, right), 5);
        assert_eq!(relative_vdesk(5, 8, 4, right), 1);
        assert_eq!(relative_vdesk(1, 8, 4, left), 5);
        assert_eq!(relative_vdesk(3, 8, 4, up), 0);
    }

    #[test]
    fn switching_hides_and_shows() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        let b = manage(&mut wm, 0x11, Rectangle::new(200, 0, 100, 100));
        wm.client_to_vdesk(b, Vdesk::Desk(1)).unwrap();
        assert_eq!(wm.conn.wm_state(0x11), Some(IcccmWindowState::Iconic));

        wm.switch_vdesk(0, Vdesk::Desk(1)).unwrap();
        assert_eq!(wm.conn.wm_state(0x10), Some(IcccmWindowState::Iconic));
        assert_eq!(wm.conn.wm_state(0x11), Some(IcccmWindowState::Normal));
        assert_eq!(wm.current, None);
        assert_eq!(wm.conn.desktop.get(), 1);
        assert!(!wm.is_visible(a));
        assert!(wm.is_visible(b));
        assert_eq!(wm.screens[0].old_vdesk, Vdesk::Desk(0));

        // Switching to the current or a missing desktop does nothing
        wm.conn.clear_requests();
        wm.switch_vdesk(0, Vdesk::Desk(1)).unwrap();
        wm.switch_vdesk(0, Vdesk::Desk(8)).unwrap();
        assert!(wm.conn.requests().is_empty());
    }

    #[test]
    fn fixed_clients_stay_focused() {
        let mut wm = wm();
        let a = manage(&mut wm, 0x10, Rectangle::new(0, 0, 100, 100));
        wm.client_to_vdesk(a, Vdesk::Fixed).unwrap();
        assert!(wm.conn.sent("border_color 0x101 0xff"));
        assert_eq!(wm.conn.desktop_of(0x10), Some(Vdesk::FIXED_CARDINAL));

        wm.switch_vdesk(0, Vdesk::Desk(3)).unwrap();
        assert_eq!(wm.current, Some(a));
        assert!(wm.is_visible(a));
        assert_eq!(wm.conn.wm_state(0x10), Some(IcccmWindowState::Normal));
    }

    #[test]
    fn toggling_and_numbered_targets() {
        let mut wm = wm();
        wm.switch_vdesk(0, Vdesk::Desk(2)).unwrap();

        let toggle = BindFlags::SCREEN | BindFlags::TOGGLE;
        assert_eq!(wm.vdesk_from_flags(0, toggle), Vdesk::Desk(0));

        let mut numbered = BindFlags::SCREEN;
        numbered.set_value(5);
        assert_eq!(wm.vdesk_from_flags(0, numbered), Vdesk::Desk(5));
        numbered.set_value(255);
        assert_eq!(wm.vdesk_from_flags(0, numbered), Vdesk::Fixed);

        let next = BindFlags::SCREEN | BindFlags::RELATIVE | BindFlags::UP;
        assert_eq!(wm.vdesk_from_flags(0, next), Vdesk::Desk(3));
    }

    #[test]
    fn hidden_docks_stay_hidden() {
        let mut wm = wm();
        let dock = manage(&mut wm, 0x10, Rectangle::new(0, 0, 1280, 20));
        wm.clients.get_mut(dock).unwrap().is_dock = true;

        wm.set_docks_visible(0, false).unwrap();
        assert_eq!(wm.conn.wm_state(0x10), Some(IcccmWindowState::Iconic));

        // Coming back to its desktop does not show it
        wm.switch_vdesk(0, Vdesk::Desk(1)).unwrap();
        wm.switch_vdesk(0, Vdesk::Desk(0)).unwrap();
        assert_eq!(wm.conn.wm_state(0x10), Some(IcccmWindowState::Iconic));

        wm.set_docks_visible(0, true).unwrap();
        assert_eq!(wm.conn.wm_state(0x10), Some(IcccmWindowState::Normal));
    }

    #[test]
    fn hiding_a_hidden_frame_expects_no_unmap() {
        let mut wm = wm();
        let dock = manage(&mut wm, 0x10, Rectangle::new(0, 0, 1280, 20));
        wm.clients.get_mut(dock).unwrap().is_dock = true;
        let expected = wm.clients.get(dock).unwrap().ignore_unmap + 1;

        wm.set_docks_visible(0, false).unwrap();
        wm.switch_vdesk(0, Vdesk::Desk(1)).unwrap();
        wm.set_docks_visible(0, false).unwrap();

        let c = wm.clients.get(dock).unwrap();
        assert!(!c.mapped);
        assert_eq!(c.ignore_unmap, expected);
        assert_eq!(wm.conn.requests().iter().filter(|r| *r == "unmap 0x101").count(), 1);

        // With the expected notifications in, the client's own unmap withdraws it
        let unmap = XEvent::UnmapNotify { window: 0x10, event: 0x10 };
        for _ in 0..expected {
            wm.handle_event(unmap.clone()).unwrap();
        }
        assert!(!wm.clients.get(dock).unwrap().remove);
        wm.handle_event(unmap).unwrap();
        assert!(wm.clients.get(dock).unwrap().remove);
    }
}
