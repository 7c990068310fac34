// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Geometry primitives (C1): the integer complex transform, the three shape
//! variants the engine is generic over, and the interaction predicates of §4.1.

pub mod predicates;
pub mod shape;
pub mod transform;

pub use predicates::EdgeInteractionMode;
pub use shape::{Edge, NetShape, PolygonRef, Text};
pub use transform::{Rotation90, Transform};

use iron_shapes::prelude::Rect;
use iron_shapes::CoordinateType;

/// A shape variant the local clustering builder and the interaction caches are
/// generic over. Implemented for `PolygonRef<C>`, `Edge<C>` and `NetShape<C>`
/// per §3 ("generic over `T`, instantiated for the three concrete variants").
pub trait ShapeVariant<C: CoordinateType>: Clone {
    /// Bounding box in the frame the shape currently lives in.
    fn bbox(&self) -> Rect<C>;

    /// Apply an additional transform on top of the shape's current placement.
    fn transformed_by(&self, trans: &Transform<C>) -> Self;

    /// Whether this shape interacts with `other`, given the edge-interaction mode
    /// configured on the connectivity descriptor (ignored by variants other than `Edge`).
    fn interacts(&self, other: &Self, edge_mode: EdgeInteractionMode) -> bool;
}

impl<C: CoordinateType> ShapeVariant<C> for PolygonRef<C> {
    fn bbox(&self) -> Rect<C> {
        PolygonRef::bbox(self)
    }

    fn transformed_by(&self, trans: &Transform<C>) -> Self {
        PolygonRef::transformed_by(self, trans)
    }

    fn interacts(&self, other: &Self, _edge_mode: EdgeInteractionMode) -> bool {
        predicates::polygons_interact(self, other)
    }
}

impl<C: CoordinateType> ShapeVariant<C> for Edge<C> {
    fn bbox(&self) -> Rect<C> {
        Edge::bbox(self)
    }

    fn transformed_by(&self, trans: &Transform<C>) -> Self {
        Edge::transformed_by(self, trans)
    }

    fn interacts(&self, other: &Self, edge_mode: EdgeInteractionMode) -> bool {
        predicates::edges_interact(self, other, edge_mode)
    }
}

impl<C: CoordinateType> ShapeVariant<C> for NetShape<C> {
    fn bbox(&self) -> Rect<C> {
        NetShape::bbox(self)
    }

    fn transformed_by(&self, trans: &Transform<C>) -> Self {
        NetShape::transformed_by(self, trans)
    }

    fn interacts(&self, other: &Self, _edge_mode: EdgeInteractionMode) -> bool {
        predicates::net_shapes_interact(self, other)
    }
}
