// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The three shape variants the clustering engine is generic over: polygon
//! references, edges and text. `NetShape` additionally bundles polygon and
//! text into the sum type used for ordinary net extraction, modeled on
//! `dbNetShape.h`'s `enum shape_type { None, Text, Polygon }`.

use crate::geometry::transform::Transform;
use crate::rc_string::RcString;
use iron_shapes::prelude::{Point, Rect};
use iron_shapes::CoordinateType;
use std::rc::Rc;

/// A reference to an interned polygon hull plus the small transform that places
/// it relative to the cell it was inserted into. See [`crate::shape_repository`]
/// for how hulls are shared between identical polygons.
#[derive(Debug, Clone)]
pub struct PolygonRef<C> {
    hull: Rc<Vec<Point<C>>>,
    trans: Transform<C>,
}

impl<C: CoordinateType> PolygonRef<C> {
    /// Build a polygon reference from an already-interned hull and a placement transform.
    pub fn new(hull: Rc<Vec<Point<C>>>, trans: Transform<C>) -> Self {
        PolygonRef { hull, trans }
    }

    /// The interned hull, in the polygon's own local coordinates.
    pub fn hull(&self) -> &[Point<C>] {
        &self.hull
    }

    /// The placement transform applied on top of the hull's local coordinates.
    pub fn transform(&self) -> &Transform<C> {
        &self.trans
    }

    /// The vertices of this polygon in the frame it is placed in.
    pub fn placed_vertices(&self) -> impl Iterator<Item = Point<C>> + '_ {
        self.hull.iter().map(move |&p| self.trans.transform_point(p))
    }

    /// Apply an additional transform on top of this reference's own placement.
    pub fn transformed_by(&self, outer: &Transform<C>) -> Self {
        PolygonRef { hull: self.hull.clone(), trans: outer.then(&self.trans) }
    }

    /// Bounding box of the placed polygon.
    pub fn bbox(&self) -> Rect<C> {
        bounding_box(self.placed_vertices())
    }
}

/// An ordered pair of points, used for edge-based net extraction (e.g. metal
/// centerlines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<C> {
    p1: Point<C>,
    p2: Point<C>,
}

impl<C: CoordinateType> Edge<C> {
    /// Create a new edge between two points.
    pub fn new(p1: Point<C>, p2: Point<C>) -> Self {
        Edge { p1, p2 }
    }

    /// The edge's first endpoint.
    pub fn p1(&self) -> Point<C> {
        self.p1
    }

    /// The edge's second endpoint.
    pub fn p2(&self) -> Point<C> {
        self.p2
    }

    /// Apply a transform to both endpoints.
    pub fn transformed_by(&self, trans: &Transform<C>) -> Self {
        Edge { p1: trans.transform_point(self.p1), p2: trans.transform_point(self.p2) }
    }

    /// Bounding box of the edge.
    pub fn bbox(&self) -> Rect<C> {
        bounding_box([self.p1, self.p2].into_iter())
    }
}

/// A text label anchored at a point, used both as a net-extraction shape and as
/// the carrier of an explicit net name (via its attribute id, stored alongside
/// the shape rather than in this struct — see [`crate::geometry::ShapeRecord`]).
#[derive(Debug, Clone)]
pub struct Text<C> {
    pos: Point<C>,
    label: RcString,
}

impl<C: CoordinateType> Text<C> {
    /// Create a new text shape.
    pub fn new(pos: Point<C>, label: impl Into<RcString>) -> Self {
        Text { pos, label: label.into() }
    }

    /// The anchor point.
    pub fn pos(&self) -> Point<C> {
        self.pos
    }

    /// The label string.
    pub fn label(&self) -> &RcString {
        &self.label
    }

    /// Apply a transform to the anchor point. The label text itself is unaffected.
    pub fn transformed_by(&self, trans: &Transform<C>) -> Self {
        Text { pos: trans.transform_point(self.pos), label: self.label.clone() }
    }

    /// Bounding box of a text shape: a degenerate point-sized box.
    pub fn bbox(&self) -> Rect<C> {
        Rect::new(self.pos, self.pos)
    }
}

/// The sum type used for ordinary net extraction: either a polygon or a text
/// label. Mirrors KLayout's `db::NetShape`.
#[derive(Debug, Clone)]
pub enum NetShape<C> {
    /// A polygon-reference shape.
    Polygon(PolygonRef<C>),
    /// A text-label shape.
    Text(Text<C>),
}

impl<C: CoordinateType> NetShape<C> {
    /// Bounding box, dispatching to the active variant.
    pub fn bbox(&self) -> Rect<C> {
        match self {
            NetShape::Polygon(p) => p.bbox(),
            NetShape::Text(t) => t.bbox(),
        }
    }

    /// Apply a transform, dispatching to the active variant.
    pub fn transformed_by(&self, trans: &Transform<C>) -> Self {
        match self {
            NetShape::Polygon(p) => NetShape::Polygon(p.transformed_by(trans)),
            NetShape::Text(t) => NetShape::Text(t.transformed_by(trans)),
        }
    }
}

/// Fold an iterator of points into their axis-aligned bounding box.
/// Panics on an empty iterator; every shape variant has at least one point.
fn bounding_box<C: CoordinateType>(mut points: impl Iterator<Item = Point<C>>) -> Rect<C> {
    let first = points.next().expect("shape must have at least one point");
    let mut r = Rect::new(first, first);
    for p in points {
        r = r.add_rect(&Rect::new(p, p));
    }
    r
}
