//! 2D geometry: points, affine matrices, lines, segments and circles.
//!
//! Everything here is a plain value type or a free function; nothing holds
//! shared state.

use std::f64::consts::PI;

use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// 2D vector type used throughout the engine, in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2f {
    pub x: f64,
    pub y: f64,
}

pub type Point = Vec2f;
pub type Size = Vec2f;

impl Vec2f {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Computes the dot product of two vectors.
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// Unsigned angle between two vectors, in radians.
    pub fn angle_to(self, rhs: Self) -> f64 {
        let cos = self.dot(rhs) / (self.length() * rhs.length());
        cos.clamp(-1.0, 1.0).acos()
    }

    pub fn to_glam(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn from_glam(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<(f64, f64)> for Vec2f {
    fn from(value: (f64, f64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

impl std::ops::Add for Vec2f {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2f {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2f {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2f {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Mul<Vec2f> for f64 {
    type Output = Vec2f;

    fn mul(self, rhs: Vec2f) -> Self::Output {
        rhs * self
    }
}

impl std::ops::Div<f64> for Vec2f {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl std::ops::Neg for Vec2f {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).length()
}

pub fn points_equal(a: Point, b: Point, delta: f64) -> bool {
    (b.x - a.x).abs() <= delta && (b.y - a.y).abs() <= delta
}

/// Unit vector in the direction of `v`, or zero for the zero vector.
pub fn normalise(v: Vec2f) -> Vec2f {
    let len = v.length();
    if len == 0.0 {
        Vec2f::ZERO
    } else {
        v / len
    }
}

/// Wraps an angle into `[0, 2π)`.
pub fn normalise_angle(a: f64) -> f64 {
    a.rem_euclid(2.0 * PI)
}

/// Closed interval `[a, b]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub a: f64,
    pub b: f64,
}

impl Range {
    pub const fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }
}

/// Which side of a [`Range`] a value was clamped to, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipResult {
    ClippedLow,
    ClippedHigh,
    NotClipped,
}

/// Clamps `x` into `range`, reporting whether and where it was clipped.
pub fn clip_number(x: f64, range: Range) -> (f64, ClipResult) {
    if x < range.a {
        (range.a, ClipResult::ClippedLow)
    } else if x > range.b {
        (range.b, ClipResult::ClippedHigh)
    } else {
        (x, ClipResult::NotClipped)
    }
}

/// Returns true if `x` lies between `a` and `b` (in either order), with
/// `delta` slack at both ends.
pub fn is_between(x: f64, a: f64, b: f64, delta: f64) -> bool {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    x + delta >= lo && x - delta <= hi
}

/// Affine transform (rotation then translation) as a 3x3 matrix.
///
/// Composition follows matrix multiplication: applying `A` then `B` to a
/// point is the same as applying `B * A` once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix(DMat3);

impl Matrix {
    pub const IDENTITY: Self = Self(DMat3::IDENTITY);

    /// Rotation by `a` radians followed by translation by `t`.
    pub fn new(a: f64, t: Vec2f) -> Self {
        let (s, c) = a.sin_cos();
        Self(DMat3::from_cols(
            DVec3::new(c, s, 0.0),
            DVec3::new(-s, c, 0.0),
            DVec3::new(t.x, t.y, 1.0),
        ))
    }

    /// Entry at row `row`, column `col`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0.col(col)[row]
    }

    pub fn tx(&self) -> f64 {
        self.get(0, 2)
    }

    pub fn ty(&self) -> f64 {
        self.get(1, 2)
    }

    /// Rotation angle recovered from the matrix entries.
    pub fn a(&self) -> f64 {
        self.get(1, 0).atan2(self.get(1, 1))
    }

    pub fn translation(&self) -> Vec2f {
        Vec2f::new(self.tx(), self.ty())
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Self::Output {
        Matrix(self.0 * rhs.0)
    }
}

impl std::ops::Mul<Point> for Matrix {
    type Output = Point;

    fn mul(self, rhs: Point) -> Self::Output {
        Point::from_glam(self.0.transform_point2(rhs.to_glam()))
    }
}

/// Slopes steeper than this are treated as vertical.
const VERTICAL_THRESHOLD: f64 = 1e15;

/// Infinite line `y = m*x + c`, or `x = x` when `vertical` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Line {
    pub m: f64,
    pub c: f64,
    pub vertical: bool,
    /// Only meaningful for vertical lines.
    pub x: f64,
}

impl Line {
    pub fn new(m: f64, c: f64) -> Self {
        Self {
            m,
            c,
            vertical: false,
            x: 0.0,
        }
    }

    pub fn vertical(x: f64) -> Self {
        Self {
            m: f64::INFINITY,
            c: 0.0,
            vertical: true,
            x,
        }
    }

    pub fn at(&self, x: f64) -> Point {
        Point::new(x, self.m * x + self.c)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineSegment {
    pub a: Point,
    pub b: Point,
}

impl LineSegment {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn line(&self) -> Line {
        let m = (self.b.y - self.a.y) / (self.b.x - self.a.x);
        if !m.is_finite() || m.abs() > VERTICAL_THRESHOLD {
            return Line::vertical(self.a.x);
        }
        Line::new(m, self.a.y - m * self.a.x)
    }

    pub fn length(&self) -> f64 {
        distance(self.a, self.b)
    }

    /// Distance of `p`'s projection from `a`, measured along the segment's
    /// direction. Negative before `a`, greater than `length()` past `b`.
    pub fn signed_distance(&self, p: Point) -> f64 {
        let dir = self.b - self.a;
        let len = dir.length();
        if len == 0.0 {
            return distance(self.a, p);
        }
        (p - self.a).dot(dir) / len
    }
}

/// Snaps a point on the segment's line to the nearest end if it falls
/// outside the segment's span.
pub fn clip_to_line_segment(p: Point, lseg: &LineSegment) -> Point {
    let d = lseg.signed_distance(p);
    if d < 0.0 {
        lseg.a
    } else if d > lseg.length() {
        lseg.b
    } else {
        p
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Circle {
    pub pos: Point,
    pub radius: f64,
}

/// Intersection of two lines, or `None` if they are parallel.
pub fn line_intersect(l0: &Line, l1: &Line) -> Option<Point> {
    match (l0.vertical, l1.vertical) {
        (true, true) => None,
        (true, false) => Some(l1.at(l0.x)),
        (false, true) => Some(l0.at(l1.x)),
        (false, false) => {
            if (l0.m - l1.m).abs() < f64::EPSILON {
                return None;
            }
            let x = (l1.c - l0.c) / (l0.m - l1.m);
            Some(l0.at(x))
        }
    }
}

fn within_segment(p: Point, lseg: &LineSegment) -> bool {
    const DELTA: f64 = 0.000001;
    is_between(p.x, lseg.a.x, lseg.b.x, DELTA) && is_between(p.y, lseg.a.y, lseg.b.y, DELTA)
}

/// Intersection point of two segments, if they cross.
pub fn line_segment_intersect(l0: &LineSegment, l1: &LineSegment) -> Option<Point> {
    let p = line_intersect(&l0.line(), &l1.line())?;
    if within_segment(p, l0) && within_segment(p, l1) {
        Some(p)
    } else {
        None
    }
}

/// Foot of the perpendicular from `p` onto `l`.
pub fn projection_onto_line(l: &Line, p: Point) -> Point {
    if l.vertical {
        return Point::new(l.x, p.y);
    }
    let x = (p.x + l.m * (p.y - l.c)) / (1.0 + l.m * l.m);
    l.at(x)
}

pub fn distance_from_line(l: &Line, p: Point) -> f64 {
    distance(p, projection_onto_line(l, p))
}

/// True iff the closest point of the segment to the circle's centre is
/// within the circle's radius.
pub fn line_segment_circle_intersect(circle: &Circle, lseg: &LineSegment) -> bool {
    let line = lseg.line();
    let closest = clip_to_line_segment(projection_onto_line(&line, circle.pos), lseg);
    distance(closest, circle.pos) <= circle.radius
}

pub fn transform_segment(lseg: &LineSegment, m: &Matrix) -> LineSegment {
    LineSegment::new(*m * lseg.a, *m * lseg.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn clip_reports_side() {
        let r = Range::new(0.0, 10.0);
        assert_eq!(clip_number(15.0, r), (10.0, ClipResult::ClippedHigh));
        assert_eq!(clip_number(-5.0, r), (0.0, ClipResult::ClippedLow));
        assert_eq!(clip_number(5.0, r), (5.0, ClipResult::NotClipped));
    }

    #[test]
    fn matrix_accessors_recover_parameters() {
        let m = Matrix::new(0.75, Vec2f::new(3.0, -2.0));
        assert!((m.a() - 0.75).abs() < EPS);
        assert!((m.tx() - 3.0).abs() < EPS);
        assert!((m.ty() + 2.0).abs() < EPS);
    }

    #[test]
    fn matrix_inverse_undoes_transform() {
        let m = Matrix::new(1.2, Vec2f::new(10.0, 4.0));
        let p = Point::new(-3.0, 7.5);
        let q = m.inverse() * (m * p);
        assert!(points_equal(p, q, EPS));
    }

    #[test]
    fn matrix_composition_is_right_to_left() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..100 {
            let a = Matrix::new(
                rng.f64() * 6.0,
                Vec2f::new(rng.f64() * 100.0 - 50.0, rng.f64() * 100.0 - 50.0),
            );
            let b = Matrix::new(
                rng.f64() * 6.0,
                Vec2f::new(rng.f64() * 100.0 - 50.0, rng.f64() * 100.0 - 50.0),
            );
            let p = Point::new(rng.f64() * 20.0 - 10.0, rng.f64() * 20.0 - 10.0);

            let stepwise = b * (a * p);
            let combined = (b * a) * p;
            assert!(points_equal(stepwise, combined, 1e-7));
        }
    }

    #[test]
    fn steep_segments_become_vertical_lines() {
        let lseg = LineSegment::new(Point::new(2.0, 0.0), Point::new(2.0, 5.0));
        let line = lseg.line();
        assert!(line.vertical);
        assert_eq!(line.x, 2.0);
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        assert!(line_intersect(&Line::new(1.0, 0.0), &Line::new(1.0, 3.0)).is_none());
        assert!(line_intersect(&Line::vertical(1.0), &Line::vertical(2.0)).is_none());
    }

    #[test]
    fn crossing_segments_intersect() {
        let l0 = LineSegment::new(Point::new(-1.0, -1.0), Point::new(1.0, 1.0));
        let l1 = LineSegment::new(Point::new(-1.0, 1.0), Point::new(1.0, -1.0));
        let p = line_segment_intersect(&l0, &l1).unwrap();
        assert!(points_equal(p, Point::ZERO, EPS));

        let l2 = LineSegment::new(Point::new(0.0, -5.0), Point::new(0.0, 5.0));
        let p = line_segment_intersect(&l0, &l2).unwrap();
        assert!(points_equal(p, Point::ZERO, EPS));
    }

    #[test]
    fn disjoint_segments_on_crossing_lines_miss() {
        let l0 = LineSegment::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let l1 = LineSegment::new(Point::new(3.0, 0.0), Point::new(4.0, -1.0));
        assert!(line_segment_intersect(&l0, &l1).is_none());
    }

    #[test]
    fn segment_circle_intersection() {
        let unit = Circle {
            pos: Point::ZERO,
            radius: 1.0,
        };

        let crossing = LineSegment::new(Point::new(-2.0, 0.5), Point::new(2.0, 0.5));
        assert!(line_segment_circle_intersect(&unit, &crossing));

        let missing = LineSegment::new(Point::new(-2.0, 1.5), Point::new(2.0, 1.5));
        assert!(!line_segment_circle_intersect(&unit, &missing));

        let tangent = LineSegment::new(Point::new(-2.0, 1.0), Point::new(2.0, 1.0));
        assert!(line_segment_circle_intersect(&unit, &tangent));

        // On the line's reach but the segment stops short.
        let short = LineSegment::new(Point::new(2.0, 0.0), Point::new(3.0, 0.0));
        assert!(!line_segment_circle_intersect(&unit, &short));

        let vertical = LineSegment::new(Point::new(0.5, -3.0), Point::new(0.5, 3.0));
        assert!(line_segment_circle_intersect(&unit, &vertical));
    }

    #[test]
    fn signed_distance_classifies_span() {
        let lseg = LineSegment::new(Point::new(0.0, 0.0), Point::new(4.0, 0.0));
        assert!(lseg.signed_distance(Point::new(-1.0, 0.0)) < 0.0);
        assert!((lseg.signed_distance(Point::new(2.0, 3.0)) - 2.0).abs() < EPS);
        assert!(lseg.signed_distance(Point::new(5.0, 0.0)) > lseg.length());
    }

    #[test]
    fn angles_wrap_into_one_turn() {
        assert!((normalise_angle(-PI / 2.0) - 1.5 * PI).abs() < EPS);
        assert!((normalise_angle(5.0 * PI) - PI).abs() < EPS);
        let v = Vec2f::new(1.0, 0.0);
        assert!((v.angle_to(Vec2f::new(0.0, 2.0)) - PI / 2.0).abs() < EPS);
    }
}
