//! The stacking order: keeping the bottom-to-top list of clients and the
//! server's view of it in step

use crate::{
    client::ClientId,
    manager::WindowManager,
    x::XConn,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

// ============================= RaisePolicy ============================== [[[

/// How far [`raise`](WindowManager::raise) and [`lower`](WindowManager::lower)
/// move a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RaisePolicy {
    /// Straight to the top or bottom
    Plain,
    /// Just past the last client visible on the same screen
    Visible,
    /// Just past the last visible client it overlaps
    Overlap,
}

impl Default for RaisePolicy {
    fn default() -> Self {
        Self::Overlap
    }
}

/// Where to splice a client into the stacking order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Restack {
    /// It is already where it belongs
    Unchanged,
    /// Directly below the given client, or on top for `None`
    Under(Option<ClientId>),
}

/// Work out where raising `id` puts it. `order` is bottom to top and
/// `qualifies` says whether a client counts for the policy; it is not asked
/// about `id` itself.
pub(crate) fn raise_target(
    order: &[ClientId],
    id: ClientId,
    policy: RaisePolicy,
    qualifies: impl Fn(ClientId) -> bool,
) -> Restack {
    if policy == RaisePolicy::Plain {
        return Restack::Under(None);
    }

    let Some(pos) = order.iter().position(|&c| c == id) else {
        return Restack::Unchanged;
    };

    match order[pos + 1..].iter().rposition(|&c| qualifies(c)) {
        None => Restack::Unchanged,
        Some(rel) => Restack::Under(order.get(pos + 1 + rel + 1).copied()),
    }
}

/// Work out where lowering `id` puts it
pub(crate) fn lower_target(
    order: &[ClientId],
    id: ClientId,
    policy: RaisePolicy,
    qualifies: impl Fn(ClientId) -> bool,
) -> Restack {
    let Some(&bottom) = order.first() else {
        return Restack::Unchanged;
    };

    if policy == RaisePolicy::Plain {
        return if bottom == id {
            Restack::Unchanged
        } else {
            Restack::Under(Some(bottom))
        };
    }

    for &c in order {
        if c == id {
            return Restack::Unchanged;
        }
        if qualifies(c) {
            return Restack::Under(Some(c));
        }
    }
    Restack::Unchanged
}

// ]]] === RaisePolicy ===

impl<X: XConn> WindowManager<X> {
    /// Put `id` directly under `upper`, or on top of everything for `None`.
    /// The server is restacked to match.
    pub(crate) fn place_under(&mut self, id: ClientId, upper: Option<ClientId>) -> Result<()> {
        let Some(parent) = self.clients.get(id).map(|c| c.parent) else {
            log::error!("place_under on a client that is gone");
            return Ok(());
        };

        match upper.and_then(|u| self.clients.get(u)).map(|u| u.parent) {
            Some(sibling) => {
                log::trace!("stacking Window({:#0x}) under Window({:#0x})", parent, sibling);
                self.conn.place_below(parent, sibling)?;
                self.clients.stack_under(id, upper);
            },
            None => {
                log::trace!("stacking Window({:#0x}) on top", parent);
                self.conn.raise(parent)?;
                self.clients.stack_under(id, None);
            },
        }

        self.publish_stacking()
    }

    /// Whether `other` counts when restacking `id` under the configured policy
    fn counts_for_restack(&self, id: ClientId, other: ClientId) -> bool {
        let (Some(c), Some(o)) = (self.clients.get(id), self.clients.get(other)) else {
            return false;
        };

        c.screen == o.screen
            && self.is_visible(other)
            && (self.settings.raise_policy != RaisePolicy::Overlap || c.overlaps(o))
    }

    pub(crate) fn raise(&mut self, id: ClientId) -> Result<()> {
        let target = raise_target(
            self.clients.stacking_order(),
            id,
            self.settings.raise_policy,
            |o| self.counts_for_restack(id, o),
        );

        match target {
            Restack::Unchanged => Ok(()),
            Restack::Under(upper) => self.place_under(id, upper),
        }
    }

    pub(crate) fn lower(&mut self, id: ClientId) -> Result<()> {
        let target = lower_target(
            self.clients.stacking_order(),
            id,
            self.settings.raise_policy,
            |o| self.counts_for_restack(id, o),
        );

        match target {
            Restack::Unchanged => Ok(()),
            Restack::Under(upper) => self.place_under(id, upper),
        }
    }
}
