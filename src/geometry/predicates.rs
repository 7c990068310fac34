// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shape-interaction predicates (§4.1): bounding-box fast rejection, closed-half-plane
//! polygon/polygon touching-or-overlap, edge interaction under the two edge modes, and
//! text-as-point-in-polygon.

use crate::geometry::shape::{Edge, NetShape, PolygonRef, Text};
use iron_shapes::prelude::{Point, Rect};
use iron_shapes::CoordinateType;

/// How two edges unify when `T = Edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeInteractionMode {
    /// Edges unite iff they lie on the same infinite line and their 1-D ranges overlap (closed).
    CollinearTouching,
    /// Edges unite only when an endpoint of one equals an endpoint of the other.
    EndpointTouching,
}

/// Closed-interval bounding-box touch test. A negative result is definitive.
pub fn bboxes_touch<C: CoordinateType>(a: &Rect<C>, b: &Rect<C>) -> bool {
    let (ax0, ay0) = point_xy(a.lower_left());
    let (ax1, ay1) = point_xy(a.upper_right());
    let (bx0, by0) = point_xy(b.lower_left());
    let (bx1, by1) = point_xy(b.upper_right());
    ax0 <= bx1 && bx0 <= ax1 && ay0 <= by1 && by0 <= ay1
}

fn point_xy<C: CoordinateType>(p: Point<C>) -> (C, C) {
    let [x, y]: [C; 2] = p.into();
    (x, y)
}

/// Polygon/polygon interaction: touching or overlapping, with shared edges and
/// shared vertices counting as interaction. Implemented via the separating-axis
/// test over both polygons' edges, which is exact for the closed-half-plane
/// semantics §4.1 asks for.
pub fn polygons_interact<C: CoordinateType>(a: &PolygonRef<C>, b: &PolygonRef<C>) -> bool {
    if !bboxes_touch(&a.bbox(), &b.bbox()) {
        return false;
    }
    let va: Vec<Point<C>> = a.placed_vertices().collect();
    let vb: Vec<Point<C>> = b.placed_vertices().collect();
    if point_in_polygon(va[0], &vb) || point_in_polygon(vb[0], &va) {
        return true;
    }
    for i in 0..va.len() {
        let e1 = Edge::new(va[i], va[(i + 1) % va.len()]);
        for j in 0..vb.len() {
            let e2 = Edge::new(vb[j], vb[(j + 1) % vb.len()]);
            if segments_touch(e1.p1(), e1.p2(), e2.p1(), e2.p2()) {
                return true;
            }
        }
    }
    false
}

/// Edge/edge interaction under the given mode.
pub fn edges_interact<C: CoordinateType>(a: &Edge<C>, b: &Edge<C>, mode: EdgeInteractionMode) -> bool {
    match mode {
        EdgeInteractionMode::EndpointTouching => a.p1() == b.p2() || a.p2() == b.p1(),
        EdgeInteractionMode::CollinearTouching => {
            if !collinear(a.p1(), a.p2(), b.p1()) || !collinear(a.p1(), a.p2(), b.p2()) {
                return false;
            }
            ranges_overlap_along(a.p1(), a.p2(), b.p1(), b.p2())
        }
    }
}

/// A text anchor interacting with a polygon: point-on-or-inside.
pub fn text_interacts_polygon<C: CoordinateType>(t: &Text<C>, p: &PolygonRef<C>) -> bool {
    if !bboxes_touch(&t.bbox(), &p.bbox()) {
        return false;
    }
    let verts: Vec<Point<C>> = p.placed_vertices().collect();
    point_in_polygon(t.pos(), &verts) || on_boundary(t.pos(), &verts)
}

/// `NetShape`/`NetShape` interaction: dispatches polygon/polygon and text/polygon;
/// two texts never interact with each other (KLayout's extraction never merges
/// through two labels alone).
pub fn net_shapes_interact<C: CoordinateType>(a: &NetShape<C>, b: &NetShape<C>) -> bool {
    match (a, b) {
        (NetShape::Polygon(pa), NetShape::Polygon(pb)) => polygons_interact(pa, pb),
        (NetShape::Text(t), NetShape::Polygon(p)) | (NetShape::Polygon(p), NetShape::Text(t)) => {
            text_interacts_polygon(t, p)
        }
        (NetShape::Text(_), NetShape::Text(_)) => false,
    }
}

fn collinear<C: CoordinateType>(a: Point<C>, b: Point<C>, p: Point<C>) -> bool {
    let (ax, ay) = point_xy(a);
    let (bx, by) = point_xy(b);
    let (px, py) = point_xy(p);
    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    cross == C::zero()
}

/// Assumes `a`-`b` and `c`-`d` are known collinear; tests 1-D range overlap
/// along the shared line, closed at both ends.
fn ranges_overlap_along<C: CoordinateType>(a: Point<C>, b: Point<C>, c: Point<C>, d: Point<C>) -> bool {
    let (ax, ay) = point_xy(a);
    let (bx, by) = point_xy(b);
    let (cx, cy) = point_xy(c);
    let (dx, dy) = point_xy(d);
    // Project onto whichever axis the segment has nonzero extent on.
    if ax != bx || cx != dx {
        let (lo1, hi1) = min_max(ax, bx);
        let (lo2, hi2) = min_max(cx, dx);
        lo1 <= hi2 && lo2 <= hi1
    } else {
        let (lo1, hi1) = min_max(ay, by);
        let (lo2, hi2) = min_max(cy, dy);
        lo1 <= hi2 && lo2 <= hi1
    }
}

fn min_max<C: CoordinateType>(a: C, b: C) -> (C, C) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Closed-half-plane segment touch test: shared endpoints and overlaps count.
fn segments_touch<C: CoordinateType>(p1: Point<C>, p2: Point<C>, p3: Point<C>, p4: Point<C>) -> bool {
    let d1 = cross3(p3, p4, p1);
    let d2 = cross3(p3, p4, p2);
    let d3 = cross3(p1, p2, p3);
    let d4 = cross3(p1, p2, p4);

    if ((d1 > C::zero() && d2 < C::zero()) || (d1 < C::zero() && d2 > C::zero()))
        && ((d3 > C::zero() && d4 < C::zero()) || (d3 < C::zero() && d4 > C::zero()))
    {
        return true;
    }
    if d1 == C::zero() && on_segment(p3, p4, p1) {
        return true;
    }
    if d2 == C::zero() && on_segment(p3, p4, p2) {
        return true;
    }
    if d3 == C::zero() && on_segment(p1, p2, p3) {
        return true;
    }
    if d4 == C::zero() && on_segment(p1, p2, p4) {
        return true;
    }
    false
}

fn cross3<C: CoordinateType>(a: Point<C>, b: Point<C>, c: Point<C>) -> C {
    let (ax, ay) = point_xy(a);
    let (bx, by) = point_xy(b);
    let (cx, cy) = point_xy(c);
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

/// `p` known collinear with segment `a`-`b`; checks it falls within the closed range.
fn on_segment<C: CoordinateType>(a: Point<C>, b: Point<C>, p: Point<C>) -> bool {
    let (ax, ay) = point_xy(a);
    let (bx, by) = point_xy(b);
    let (px, py) = point_xy(p);
    let (lox, hix) = min_max(ax, bx);
    let (loy, hiy) = min_max(ay, by);
    px >= lox && px <= hix && py >= loy && py <= hiy
}

fn on_boundary<C: CoordinateType>(p: Point<C>, verts: &[Point<C>]) -> bool {
    for i in 0..verts.len() {
        let a = verts[i];
        let b = verts[(i + 1) % verts.len()];
        if cross3(a, b, p) == C::zero() && on_segment(a, b, p) {
            return true;
        }
    }
    false
}

/// Closed (boundary-inclusive) point-in-polygon test via the standard ray-casting
/// winding rule. `on_boundary` handles the exact-boundary case separately because
/// ray casting alone is unreliable on degenerate/collinear hits.
fn point_in_polygon<C: CoordinateType>(p: Point<C>, verts: &[Point<C>]) -> bool {
    if on_boundary(p, verts) {
        return true;
    }
    let (px, py) = point_xy(p);
    let mut inside = false;
    let n = verts.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = point_xy(verts[i]);
        let (xj, yj) = point_xy(verts[j]);
        let intersects = ((yi > py) != (yj > py))
            && (px < (xj - xi) * (py - yi) / (yj - yi) + xi);
        if intersects {
            inside = !inside;
        }
        j = i;
    }
    inside
}
