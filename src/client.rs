//! Managed clients and the registry that owns them.
//!
//! Every [`Client`] lives in a slot of the [`ClientRegistry`] arena and is
//! referred to by a [`ClientId`]. The registry keeps three orderings over the
//! same set of clients:
//!
//! - **tab**: most recently used first, drives focus cycling
//! - **mapping**: insertion order, published as `_NET_CLIENT_LIST`
//! - **stacking**: bottom to top, mirrors the server's stacking order

use crate::{
    geometry::{Gravity, Rectangle, SizeConstraints},
    x::Window,
};
use std::fmt;

// ================================ Vdesk ================================= [[[

/// A virtual desktop, or the pseudo desktop of clients visible on all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Vdesk {
    Desk(u32),
    Fixed,
}

impl Vdesk {
    /// How [`Vdesk::Fixed`] is written into `_NET_WM_DESKTOP`
    pub(crate) const FIXED_CARDINAL: u32 = 0xFFFF_FFFF;

    /// Decode a `_NET_WM_DESKTOP`/`_NET_CURRENT_DESKTOP` value
    pub(crate) const fn from_cardinal(value: u32) -> Self {
        if value == Self::FIXED_CARDINAL {
            Self::Fixed
        } else {
            Self::Desk(value)
        }
    }

    /// Encode for publishing
    pub(crate) const fn to_cardinal(self) -> u32 {
        match self {
            Self::Desk(n) => n,
            Self::Fixed => Self::FIXED_CARDINAL,
        }
    }

    /// Whether this desktop exists given `count` numbered desktops
    pub(crate) const fn is_valid(self, count: u32) -> bool {
        match self {
            Self::Desk(n) => n < count,
            Self::Fixed => true,
        }
    }

    pub(crate) const fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed)
    }
}

impl fmt::Display for Vdesk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Desk(n) => write!(f, "{}", n),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

// ]]] === Vdesk ===

// ================================ Client ================================ [[[

/// A managed top-level window and the frame it was reparented into
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Client {
    /// The application's window
    pub(crate) window:        Window,
    /// The frame created for it
    pub(crate) parent:        Window,
    /// Index into the window manager's screens
    pub(crate) screen:        usize,
    /// Geometry of the application window, excluding the border
    pub(crate) rect:          Rectangle,
    pub(crate) border:        i32,
    /// Border the window had before it was managed
    pub(crate) old_border:    i32,
    /// Border used whenever the client is not fully maximised
    pub(crate) normal_border: i32,
    pub(crate) hints:         SizeConstraints,
    /// Gravity currently in effect
    pub(crate) gravity:       Gravity,
    /// Gravity from `WM_NORMAL_HINTS`
    pub(crate) gravity_hint:  Gravity,
    pub(crate) vdesk:         Vdesk,
    /// `(x, width)` from before a horizontal maximise
    pub(crate) saved_horz:    Option<(i32, i32)>,
    /// `(y, height)` from before a vertical maximise
    pub(crate) saved_vert:    Option<(i32, i32)>,
    pub(crate) is_dock:       bool,
    /// Set once the client has been withdrawn; removed after the event batch
    pub(crate) remove:        bool,
    /// Unmap notifications still expected because of our own requests
    pub(crate) ignore_unmap:  u32,
    /// Whether the frame is mapped
    pub(crate) mapped:        bool,
    /// Ignore configure requests from the client
    pub(crate) manual:        bool,
    pub(crate) colormap:      u32,
    /// Monitor the client was last placed on, used to break ties
    pub(crate) mon_name:      Option<String>,
}

impl Client {
    /// Create a new [`Client`] for `window` on `screen`, before any
    /// properties have been read
    pub(crate) fn new(window: Window, screen: usize, vdesk: Vdesk) -> Self {
        Self {
            window,
            parent: window,
            screen,
            rect: Rectangle::default(),
            border: 0,
            old_border: 0,
            normal_border: 0,
            hints: SizeConstraints::default(),
            gravity: Gravity::default(),
            gravity_hint: Gravity::default(),
            vdesk,
            saved_horz: None,
            saved_vert: None,
            is_dock: false,
            remove: false,
            ignore_unmap: 0,
            mapped: false,
            manual: false,
            colormap: 0,
            mon_name: None,
        }
    }

    /// The box covered by the client including its border
    pub(crate) const fn bordered(&self) -> Rectangle {
        self.rect.with_border(self.border)
    }

    /// Position of the frame window
    pub(crate) const fn frame_origin(&self) -> (i32, i32) {
        (self.rect.x - self.border, self.rect.y - self.border)
    }

    pub(crate) const fn is_fixed(&self) -> bool {
        self.vdesk.is_fixed()
    }

    /// Whether the client shows while `current` is the screen's desktop
    pub(crate) fn is_visible_on(&self, current: Vdesk) -> bool {
        self.vdesk.is_fixed() || self.vdesk == current
    }

    pub(crate) const fn is_maximised_both(&self) -> bool {
        self.saved_horz.is_some() && self.saved_vert.is_some()
    }

    /// Shift the client so that adding a border of `bw` (or removing one,
    /// when negative) keeps its gravity's reference point in place. An axis
    /// along which the client exactly fills the screen is left alone.
    pub(crate) fn gravitate(&mut self, bw: i32, screen: (i32, i32)) {
        let (dx, dy) = self.gravity.border_offset(bw);
        if self.rect.x != 0 || self.rect.width != screen.0 {
            self.rect.x += dx;
        }
        if self.rect.y != 0 || self.rect.height != screen.1 {
            self.rect.y += dy;
        }
    }

    /// Whether two clients' bordered boxes overlap. Touching edges do not
    /// count.
    pub(crate) const fn overlaps(&self, other: &Self) -> bool {
        let cx1 = self.rect.x - self.border;
        let cy1 = self.rect.y - self.border;
        let cx2 = cx1 + self.rect.width + self.border;
        let cy2 = cy1 + self.rect.height + self.border;

        let ox1 = other.rect.x - other.border;
        let oy1 = other.rect.y - other.border;
        let ox2 = ox1 + other.rect.width + other.border;
        let oy2 = oy1 + other.rect.height + other.border;

        !(ox1 > cx2 || oy1 > cy2 || cx1 > ox2 || cy1 > oy2)
    }
}

// ]]] === Client ===

// ============================ ClientRegistry ============================ [[[

/// Stable handle to a client in the [`ClientRegistry`]. The generation makes
/// a handle to a removed client fail to resolve even if its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ClientId {
    index:      u32,
    generation: u32,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    client:     Option<Client>,
}

/// Owner of every managed [`Client`] and its three orderings
#[derive(Debug, Clone, Default)]
pub(crate) struct ClientRegistry {
    slots:    Vec<Slot>,
    free:     Vec<u32>,
    tab:      Vec<ClientId>,
    mapping:  Vec<ClientId>,
    stacking: Vec<ClientId>,
}

impl ClientRegistry {
    /// Create an empty [`ClientRegistry`]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a client: head of the tab order, end of the mapping order and top
    /// of the stacking order
    pub(crate) fn insert(&mut self, client: Client) -> ClientId {
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.client = Some(client);
            ClientId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                client:     Some(client),
            });
            ClientId {
                index:      (self.slots.len() - 1) as u32,
                generation: 0,
            }
        };

        self.tab.insert(0, id);
        self.mapping.push(id);
        self.stacking.push(id);
        id
    }

    /// Drop a client from the arena and from all three orderings at once
    pub(crate) fn remove(&mut self, id: ClientId) -> Option<Client> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let client = slot.client.take()?;

        self.tab.retain(|&c| c != id);
        self.mapping.retain(|&c| c != id);
        self.stacking.retain(|&c| c != id);
        self.free.push(id.index);

        Some(client)
    }

    pub(crate) fn get(&self, id: ClientId) -> Option<&Client> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.client.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.client.as_mut())
    }

    /// Find the client owning `window`, which may be either its application
    /// window or its frame
    pub(crate) fn find(&self, window: Window) -> Option<ClientId> {
        self.tab.iter().copied().find(|&id| {
            self.get(id)
                .map_or(false, |c| c.window == window || c.parent == window)
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.tab.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }

    /// Most recently used first
    pub(crate) fn tab_order(&self) -> &[ClientId] {
        &self.tab
    }

    /// Insertion order
    pub(crate) fn mapping_order(&self) -> &[ClientId] {
        &self.mapping
    }

    /// Bottom to top
    pub(crate) fn stacking_order(&self) -> &[ClientId] {
        &self.stacking
    }

    /// Iterate over clients in tab order
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> + '_ {
        self.tab
            .iter()
            .filter_map(move |&id| self.get(id).map(|c| (id, c)))
    }

    /// Move a client to the head of the tab order
    pub(crate) fn touch(&mut self, id: ClientId) {
        if let Some(pos) = self.tab.iter().position(|&c| c == id) {
            let id = self.tab.remove(pos);
            self.tab.insert(0, id);
        }
    }

    /// Splice `id` into the stacking order directly below `upper`, or onto
    /// the top when `upper` is `None` or no longer present
    pub(crate) fn stack_under(&mut self, id: ClientId, upper: Option<ClientId>) {
        let Some(pos) = self.stacking.iter().position(|&c| c == id) else {
            return;
        };
        self.stacking.remove(pos);

        match upper.and_then(|u| self.stacking.iter().position(|&c| c == u)) {
            Some(at) => self.stacking.insert(at, id),
            None => self.stacking.push(id),
        }
    }

    /// Every live client appears exactly once in each ordering
    pub(crate) fn is_consistent(&self) -> bool {
        let live = self.slots.iter().filter(|s| s.client.is_some()).count();
        [&self.tab, &self.mapping, &self.stacking].iter().all(|order| {
            order.len() == live
                && order.iter().all(|&id| {
                    self.get(id).is_some() && order.iter().filter(|&&o| o == id).count() == 1
                })
        })
    }
}

// ]]] === ClientRegistry ===
