//! Placement arithmetic: choosing a monitor, snapping to edges, sweeping out
//! a new size, maximising, and rescaling after the screen changes size.
//!
//! Everything here is pure; the [`WindowManager`](crate::manager::WindowManager)
//! collects the candidate rectangles and applies the results.

use crate::{
    geometry::{bound, Point, Rectangle, SizeConstraints},
    screen::Monitor,
};

/// Return whichever value has the smaller magnitude, preferring `b` on a tie
pub(crate) fn absmin(a: i32, b: i32) -> i32 {
    if a.abs() < b.abs() {
        a
    } else {
        b
    }
}

/// Whether the span `[a, b]` (in either order) touches `[min, max]`
pub(crate) const fn spans(a: i32, b: i32, min: i32, max: i32) -> bool {
    !((a < min && b < min) || (a > max && b > max))
}

// =========================== Monitor selection ========================== [[[

/// Pick the monitor a client belongs to.
///
/// `bordered` is the client's box including its border. The monitor sharing
/// the largest fraction of its own area with the client wins; ties go to the
/// monitor named `mon_name`. Without any intersection the monitor whose center
/// is nearest to the client's center is chosen. Returns the index of the
/// monitor and whether the client intersects it.
pub(crate) fn closest_monitor(
    bordered: &Rectangle,
    monitors: &[Monitor],
    mon_name: Option<&str>,
) -> (usize, bool) {
    let mut best: Option<usize> = None;
    let mut best_area = 0_i64;
    let mut best_distance = f64::MAX;
    let mut intersects = false;
    let center = bordered.center();

    for (idx, mon) in monitors.iter().enumerate() {
        let area = bordered.intersection_area(&mon.rect);

        if area > 0 {
            // Compare `area / mon.area` against the best ratio without floats
            let (lhs, rhs) = match best {
                Some(b) if intersects =>
                    (
                        i128::from(area) * i128::from(monitors[b].area),
                        i128::from(best_area) * i128::from(mon.area),
                    ),
                _ => (1, 0),
            };

            if lhs > rhs {
                best = Some(idx);
                best_area = area;
                intersects = true;
            } else if lhs == rhs && mon_name.is_some() && mon.name.as_deref() == mon_name {
                best = Some(idx);
                best_area = area;
            }
            continue;
        }

        if !intersects {
            let distance = center.distance(mon.rect.center());
            if best.is_none() || distance < best_distance {
                best = Some(idx);
                best_distance = distance;
            }
        }
    }

    (best.unwrap_or(0), intersects)
}

/// If a client lies entirely outside its closest monitor, drag it back so
/// that at least its edge touches that monitor
pub(crate) fn pull_onto_monitor(rect: &Rectangle, mon: &Rectangle) -> Rectangle {
    let mut r = *rect;
    if r.x > mon.right() {
        r.x = mon.right();
    }
    if r.x < mon.x - r.width {
        r.x = mon.x - r.width;
    }
    if r.y > mon.bottom() {
        r.y = mon.bottom();
    }
    if r.y < mon.y - r.height {
        r.y = mon.y - r.height;
    }
    r
}

// ]]] === Monitor selection ===

// ================================= Snap ================================= [[[

/// A rectangle that can be snapped against, with its border width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SnapTarget {
    pub(crate) rect:   Rectangle,
    pub(crate) border: i32,
}

impl SnapTarget {
    /// The edges of a monitor, expressed as a borderless client lying just
    /// inside it so that a client of border `bw` snaps flush to the edge
    pub(crate) const fn monitor(mon: &Rectangle, bw: i32) -> Self {
        Self {
            rect:   Rectangle::new(mon.x + bw, mon.y + bw, mon.width - 2 * bw, mon.height - 2 * bw),
            border: 0,
        }
    }
}

/// Snap a client's position to the nearest edge of any target.
///
/// On each axis the smallest offset that would make an edge of the client
/// line up with an edge of a target is found; it is only applied when its
/// magnitude is strictly less than `snap`.
pub(crate) fn snap(rect: &Rectangle, bw: i32, targets: &[SnapTarget], snap: i32) -> Point {
    let mut dx = snap;
    let mut dy = snap;
    let c = rect;

    for t in targets {
        let (ci, cb) = (&t.rect, t.border);

        if ci.y - cb - bw - c.height - c.y <= snap && c.y - bw - cb - ci.height - ci.y <= snap {
            dx = absmin(dx, ci.x + ci.width - c.x + bw + cb);
            dx = absmin(dx, ci.x + ci.width - c.x - c.width);
            dx = absmin(dx, ci.x - c.x - c.width - bw - cb);
            dx = absmin(dx, ci.x - c.x);
        }

        if ci.x - cb - bw - c.width - c.x <= snap && c.x - bw - cb - ci.width - ci.x <= snap {
            dy = absmin(dy, ci.y + ci.height - c.y + bw + cb);
            dy = absmin(dy, ci.y + ci.height - c.y - c.height);
            dy = absmin(dy, ci.y - c.y - c.height - bw - cb);
            dy = absmin(dy, ci.y - c.y);
        }
    }

    let mut pos = Point::new(c.x, c.y);
    if dx.abs() < snap {
        pos.x += dx;
    }
    if dy.abs() < snap {
        pos.y += dy;
    }
    pos
}

/// Snap the moving corner of a sweep to nearby edges
pub(crate) fn snap_sweep(anchor: Point, pointer: Point, targets: &[SnapTarget], snap: i32) -> Point {
    let mut dx = snap;
    let mut dy = snap;

    for t in targets {
        let ci = &t.rect;
        if spans(anchor.y, pointer.y, ci.y, ci.bottom()) {
            dx = absmin(dx, ci.x - pointer.x);
            dx = absmin(dx, ci.right() - pointer.x);
        }
        if spans(anchor.x, pointer.x, ci.x, ci.right()) {
            dy = absmin(dy, ci.y - pointer.y);
            dy = absmin(dy, ci.bottom() - pointer.y);
        }
    }

    let mut p = pointer;
    if dx.abs() < snap {
        p.x += dx;
    }
    if dy.abs() < snap {
        p.y += dy;
    }
    p
}

// ]]] === Snap ===

// ================================= Sweep ================================ [[[

/// Size and origin along one axis of a box swept from `from` to `to`.
/// The size is stepped in increments and then bounded by the hints.
pub(crate) fn sweep_axis(from: i32, to: i32, base: i32, inc: i32, min: i32, max: i32) -> (i32, i32) {
    let mut size = (from - to).abs();
    size -= (size - base) % inc;
    if inc != 1 {
        size += inc;
    }
    size = bound(size, min, max);

    let pos = if from <= to { from } else { from - size };
    (pos, size)
}

/// Recompute a client's geometry from a sweep between `anchor` and `pointer`.
/// Axes flagged as maximised keep their geometry unless `force` is set.
pub(crate) fn sweep(
    rect: &Rectangle,
    hints: &SizeConstraints,
    anchor: Point,
    pointer: Point,
    keep_horz: bool,
    keep_vert: bool,
) -> Rectangle {
    let mut r = *rect;

    if !keep_horz {
        let (x, w) = sweep_axis(
            anchor.x,
            pointer.x,
            hints.base_width,
            hints.width_inc,
            hints.min_width,
            hints.max_width,
        );
        r.x = x;
        r.width = w;
    }

    if !keep_vert {
        let (y, h) = sweep_axis(
            anchor.y,
            pointer.y,
            hints.base_height,
            hints.height_inc,
            hints.min_height,
            hints.max_height,
        );
        r.y = y;
        r.height = h;
    }

    r
}

// ]]] === Sweep ===

// =============================== Maximise =============================== [[[

/// What to do with the maximised state of an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaximiseAction {
    Remove,
    Add,
    Toggle,
}

impl MaximiseAction {
    /// Decode the `_NET_WM_STATE` action field
    pub(crate) const fn from_net(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// Maximise or restore one axis.
///
/// `span` is `(pos, size)` on that axis, `saved` the pre-maximise pair if the
/// axis is currently maximised, and `target` the `(pos, size)` to fill.
/// Returns whether anything changed.
pub(crate) fn maximise_axis(
    span: &mut (i32, i32),
    saved: &mut Option<(i32, i32)>,
    target: (i32, i32),
    action: MaximiseAction,
) -> bool {
    match (*saved, action) {
        (Some(old), MaximiseAction::Remove | MaximiseAction::Toggle) => {
            *span = old;
            *saved = None;
            true
        },
        (None, MaximiseAction::Add | MaximiseAction::Toggle) => {
            *saved = Some(*span);
            *span = target;
            true
        },
        _ => false,
    }
}

// ]]] === Maximise ===

// ================================ Scaling =============================== [[[

/// Scale a coordinate from an old screen dimension to a new one. Windows are
/// scaled by the room left around them unless they span the whole dimension.
pub(crate) fn scale_pos(new_size: i32, old_size: i32, pos: i32, size: i32) -> i32 {
    let (mut new, mut old) = (new_size, old_size);
    if old != size && new != size {
        new -= size;
        old -= size;
    }
    if old == 0 {
        return pos;
    }
    (i64::from(new) * i64::from(pos) / i64::from(old)) as i32
}

/// Initial position for a window that did not ask for one: proportional to
/// where the pointer is on the screen
pub(crate) fn pointer_relative(pointer: i32, screen: i32, size: i32, bw: i32) -> i32 {
    if screen <= 0 {
        return 0;
    }
    (i64::from(pointer) * i64::from(screen - bw - size) / i64::from(screen)) as i32
}

/// Where the info banner of size `banner` goes for a client: flush with the
/// client's top-right corner, kept on screen
pub(crate) fn info_position(rect: &Rectangle, bw: i32, banner: (i32, i32), screen: (i32, i32)) -> Point {
    let (iw, ih) = banner;
    let mut x = rect.x + bw + rect.width - iw;
    let mut y = rect.y - bw;

    if x + iw > screen.0 {
        x = screen.0 - iw;
    }
    if x < 0 {
        x = 0;
    }
    if y + ih > screen.1 {
        y = screen.1 - ih;
    }
    if y < 0 {
        y = 0;
    }

    Point::new(x, y)
}

// ]]] === Scaling ===
