//! Screens and the monitors that tile them

use crate::{client::Vdesk, geometry::Rectangle, x::Window};

// =============================== Monitor ================================ [[[

/// One output of a screen, as reported by RandR or Xinerama
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Monitor {
    pub(crate) rect: Rectangle,
    /// Cached so monitor selection does not recompute it per client
    pub(crate) area: i64,
    pub(crate) name: Option<String>,
}

impl Monitor {
    /// Create a new [`Monitor`]
    pub(crate) fn new(rect: Rectangle, name: Option<String>) -> Self {
        Self {
            area: rect.area(),
            rect,
            name,
        }
    }
}

// ]]] === Monitor ===

// ============================= BorderColors ============================= [[[

/// Allocated pixel values for the three border states
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BorderColors {
    /// The focused client
    pub(crate) active:   u32,
    /// Every other client
    pub(crate) inactive: u32,
    /// The focused client when it is fixed
    pub(crate) fixed:    u32,
}

// ]]] === BorderColors ===

// ================================ Screen ================================ [[[

/// Per-root state
#[derive(Debug, Clone)]
pub(crate) struct Screen {
    /// Protocol screen number
    pub(crate) number:        usize,
    pub(crate) root:          Window,
    pub(crate) width:         i32,
    pub(crate) height:        i32,
    pub(crate) monitors:      Vec<Monitor>,
    pub(crate) vdesk:         Vdesk,
    /// Desktop to return to when toggling
    pub(crate) old_vdesk:     Vdesk,
    pub(crate) docks_visible: bool,
    pub(crate) colors:        BorderColors,
    /// Last value published as `_NET_ACTIVE_WINDOW`
    pub(crate) active:        Option<Window>,
    /// Window carrying `_NET_SUPPORTING_WM_CHECK`
    pub(crate) supporting:    Option<Window>,
}

impl Screen {
    /// Create a new [`Screen`]. Until monitors are scanned the whole screen
    /// counts as a single monitor.
    pub(crate) fn new(number: usize, root: Window, width: i32, height: i32) -> Self {
        let mut screen = Self {
            number,
            root,
            width,
            height,
            monitors: vec![],
            vdesk: Vdesk::Desk(0),
            old_vdesk: Vdesk::Desk(0),
            docks_visible: true,
            colors: BorderColors::default(),
            active: None,
            supporting: None,
        };
        screen.set_monitors(vec![]);
        screen
    }

    /// The whole root window
    pub(crate) const fn rect(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width, self.height)
    }

    /// Replace the monitor list, falling back to the whole screen when the
    /// server reported none
    pub(crate) fn set_monitors(&mut self, monitors: Vec<Monitor>) {
        self.monitors = if monitors.is_empty() {
            vec![Monitor::new(self.rect(), None)]
        } else {
            monitors
        };
    }

    /// Get a monitor by index; out of range yields the first one
    pub(crate) fn monitor(&self, idx: usize) -> &Monitor {
        self.monitors.get(idx).unwrap_or(&self.monitors[0])
    }
}

// ]]] === Screen ===
