// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Integer complex transforms (rotation, mirror, rational magnification, displacement).
//!
//! Modeled on `disp_trans`/`ICplxTrans` in KLayout's `dbPolygon.h`: mirror is applied
//! first, then rotation, then magnification, then displacement. Mirror and rotation are
//! folded into a single 2x2 matrix with entries in `{-1, 0, 1}` internally, which makes
//! composition and inversion exact matrix algebra instead of case analysis.

use iron_shapes::prelude::{Point, Rect};
use iron_shapes::CoordinateType;

/// One of the four axis-aligned rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation90 {
    /// No rotation.
    R0,
    /// 90 degree counter-clockwise.
    R90,
    /// 180 degree.
    R180,
    /// 270 degree counter-clockwise.
    R270,
}

/// A 2x2 matrix with entries restricted to `{-1, 0, 1}`, representing one of the
/// 8 elements of the dihedral group of the square (rotations + mirror).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Mat2 {
    a: i8,
    b: i8,
    c: i8,
    d: i8,
}

impl Mat2 {
    const IDENTITY: Mat2 = Mat2 { a: 1, b: 0, c: 0, d: 1 };

    fn rotation(rot: Rotation90) -> Mat2 {
        match rot {
            Rotation90::R0 => Mat2 { a: 1, b: 0, c: 0, d: 1 },
            Rotation90::R90 => Mat2 { a: 0, b: -1, c: 1, d: 0 },
            Rotation90::R180 => Mat2 { a: -1, b: 0, c: 0, d: -1 },
            Rotation90::R270 => Mat2 { a: 0, b: 1, c: -1, d: 0 },
        }
    }

    const MIRROR_X: Mat2 = Mat2 { a: 1, b: 0, c: 0, d: -1 };

    fn mul(&self, other: &Mat2) -> Mat2 {
        Mat2 {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
        }
    }

    fn apply<C: CoordinateType>(&self, p: Point<C>) -> Point<C> {
        let [x, y]: [C; 2] = p.into();
        let a = C::from(self.a as i64).unwrap();
        let b = C::from(self.b as i64).unwrap();
        let c = C::from(self.c as i64).unwrap();
        let d = C::from(self.d as i64).unwrap();
        Point::from((a * x + b * y, c * x + d * y))
    }

    /// The inverse of an orthogonal {-1,0,1}-matrix from this group is its transpose.
    fn inverted(&self) -> Mat2 {
        Mat2 { a: self.a, b: self.c, c: self.b, d: self.d }
    }

    fn decompose(&self) -> (bool, Rotation90) {
        for mirror in [false, true] {
            let base = if mirror { Mat2::MIRROR_X } else { Mat2::IDENTITY };
            for rot in [Rotation90::R0, Rotation90::R90, Rotation90::R180, Rotation90::R270] {
                if Mat2::rotation(rot).mul(&base) == *self {
                    return (mirror, rot);
                }
            }
        }
        unreachable!("matrix is not a member of the mirror/rotation group")
    }
}

/// An integer complex transform: optional mirror (at the x-axis), a 90-degree
/// rotation, a rational magnification and an integer displacement.
///
/// Application order to a point `p`: mirror, then rotate, then scale by
/// `mag_num / mag_den`, then add `disp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform<C> {
    matrix: Mat2,
    mag_num: i64,
    mag_den: i64,
    disp: Point<C>,
}

impl<C: CoordinateType> Transform<C> {
    /// The identity transform.
    pub fn identity() -> Self {
        Transform {
            matrix: Mat2::IDENTITY,
            mag_num: 1,
            mag_den: 1,
            disp: Point::from((C::zero(), C::zero())),
        }
    }

    /// Create a transform from its components. `mag_num`/`mag_den` must form a
    /// reduced or unreduced positive rational; `mag_den` must not be zero.
    pub fn new(mirror: bool, rotation: Rotation90, mag_num: i64, mag_den: i64, disp: Point<C>) -> Self {
        assert!(mag_den != 0, "magnification denominator must not be zero");
        let base = if mirror { Mat2::MIRROR_X } else { Mat2::IDENTITY };
        let matrix = Mat2::rotation(rotation).mul(&base);
        Transform { matrix, mag_num, mag_den, disp }
    }

    /// A pure displacement.
    pub fn displacement(disp: Point<C>) -> Self {
        Transform { disp, ..Self::identity() }
    }

    /// Whether this transform mirrors at the x-axis before rotating.
    pub fn is_mirror(&self) -> bool {
        self.matrix.decompose().0
    }

    /// The rotation component.
    pub fn rotation(&self) -> Rotation90 {
        self.matrix.decompose().1
    }

    /// The displacement component.
    pub fn disp(&self) -> Point<C> {
        self.disp
    }

    /// `true` if this is the identity transform.
    pub fn is_unity(&self) -> bool {
        self.matrix == Mat2::IDENTITY
            && self.mag_num == self.mag_den
            && self.disp == Point::from((C::zero(), C::zero()))
    }

    /// Apply the transform to a point. Exact as long as the point's
    /// coordinates are representable after scaling by `mag_num/mag_den`.
    pub fn transform_point(&self, p: Point<C>) -> Point<C> {
        let rotated = self.matrix.apply(p);
        let [x, y]: [C; 2] = rotated.into();
        let num = C::from(self.mag_num).expect("magnification numerator out of range");
        let den = C::from(self.mag_den).expect("magnification denominator out of range");
        let x = x * num / den;
        let y = y * num / den;
        let [dx, dy]: [C; 2] = self.disp.into();
        Point::from((x + dx, y + dy))
    }

    /// Apply the transform to a rectangle, returning its (axis-aligned) bounding box.
    /// The rectangle's corners may end up swapped by a rotation/mirror, so the result
    /// is re-normalized into lower-left/upper-right order.
    pub fn transform_rect(&self, r: Rect<C>) -> Rect<C> {
        let a = self.transform_point(r.lower_left());
        let b = self.transform_point(r.upper_right());
        let [ax, ay]: [C; 2] = a.into();
        let [bx, by]: [C; 2] = b.into();
        let (x0, x1) = if ax < bx { (ax, bx) } else { (bx, ax) };
        let (y0, y1) = if ay < by { (ay, by) } else { (by, ay) };
        Rect::new(Point::from((x0, y0)), Point::from((x1, y1)))
    }

    /// Compose two transforms: the result maps a point `p` to
    /// `self.transform_point(other.transform_point(p))`.
    pub fn then(&self, other: &Self) -> Self {
        let matrix = self.matrix.mul(&other.matrix);
        let mag_num = self.mag_num * other.mag_num;
        let mag_den = self.mag_den * other.mag_den;
        // disp_new = self.matrix * (self.scale * other.disp) + self.disp
        let scaled_other_disp = {
            let rotated = self.matrix.apply(other.disp);
            let [x, y]: [C; 2] = rotated.into();
            let num = C::from(self.mag_num).unwrap();
            let den = C::from(self.mag_den).unwrap();
            Point::from((x * num / den, y * num / den))
        };
        let [sx, sy]: [C; 2] = scaled_other_disp.into();
        let [dx, dy]: [C; 2] = self.disp.into();
        let disp = Point::from((sx + dx, sy + dy));
        Transform { matrix, mag_num, mag_den, disp }
    }

    /// The inverse transform. Exact because the magnification is rational.
    pub fn inverted(&self) -> Self {
        let matrix = self.matrix.inverted();
        let mag_num = self.mag_den;
        let mag_den = self.mag_num;
        // new_disp = -(matrix * disp) * (mag_num/mag_den)
        let rotated = matrix.apply(self.disp);
        let [x, y]: [C; 2] = rotated.into();
        let num = C::from(mag_num).unwrap();
        let den = C::from(mag_den).unwrap();
        let disp = Point::from((C::zero() - x * num / den, C::zero() - y * num / den));
        Transform { matrix, mag_num, mag_den, disp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_roundtrip() {
        let t: Transform<i32> = Transform::identity();
        let p = Point::from((3, 4));
        assert_eq!(t.transform_point(p), p);
    }

    #[test]
    fn rotate_90_then_invert() {
        let t: Transform<i32> = Transform::new(false, Rotation90::R90, 1, 1, Point::from((10, 0)));
        let p = Point::from((1, 0));
        let q = t.transform_point(p);
        let back = t.inverted().transform_point(q);
        assert_eq!(back, p);
    }

    #[test]
    fn mirror_then_rotate() {
        let t: Transform<i32> = Transform::new(true, Rotation90::R90, 1, 1, Point::from((0, 0)));
        // Mirror at x-axis: (1, 2) -> (1, -2). Then rotate 90 ccw: (x,y) -> (-y, x) => (2, 1).
        assert_eq!(t.transform_point(Point::from((1, 2))), Point::from((2, 1)));
    }

    #[test]
    fn composition_matches_sequential_application() {
        let a: Transform<i32> = Transform::new(false, Rotation90::R90, 1, 1, Point::from((5, 0)));
        let b: Transform<i32> = Transform::displacement(Point::from((1, 2)));
        let composed = a.then(&b);
        let p = Point::from((3, 4));
        assert_eq!(composed.transform_point(p), a.transform_point(b.transform_point(p)));
    }

    #[test]
    fn composition_with_magnification_matches_sequential_application() {
        let a: Transform<i32> = Transform::new(true, Rotation90::R180, 2, 1, Point::from((5, -3)));
        let b: Transform<i32> = Transform::new(false, Rotation90::R90, 1, 2, Point::from((4, 2)));
        let composed = a.then(&b);
        let p = Point::from((6, -8));
        assert_eq!(composed.transform_point(p), a.transform_point(b.transform_point(p)));
    }

    #[test]
    fn inverted_undoes_composed_transform() {
        let a: Transform<i32> = Transform::new(true, Rotation90::R270, 1, 1, Point::from((-2, 7)));
        let p = Point::from((11, -4));
        let q = a.transform_point(p);
        assert_eq!(a.inverted().transform_point(q), p);
    }
}
