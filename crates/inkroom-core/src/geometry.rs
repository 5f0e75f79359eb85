//! Pure geometry over elements: hit testing, bounds and translation.

use crate::shapes::{Element, ElementId};
use kurbo::{Point, Rect, Size, Vec2};

/// Pointer distance, in canvas units, within which strokes count as hit.
pub const HIT_TOLERANCE: f64 = 8.0;

/// Hit box assumed for text elements that carry no wrapping box.
pub const TEXT_FALLBACK_SIZE: Size = Size::new(200.0, 30.0);

/// Length of each arrowhead wing.
pub const ARROW_HEAD_LENGTH: f64 = 15.0;

/// Angle between the shaft and each arrowhead wing.
pub const ARROW_HEAD_ANGLE: f64 = std::f64::consts::FRAC_PI_6;

/// Knobs for [`hit_test`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestOptions {
    pub tolerance: f64,
    pub text_fallback: Size,
}

impl Default for HitTestOptions {
    fn default() -> Self {
        Self {
            tolerance: HIT_TOLERANCE,
            text_fallback: TEXT_FALLBACK_SIZE,
        }
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (point - (a + seg * t)).hypot()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (point - *only).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance to a segment, counted only when the perpendicular foot falls
/// within the segment span. Degenerate segments use the point distance.
fn distance_within_span(point: Point, a: Point, b: Point) -> Option<f64> {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return Some((point - a).hypot());
    }
    let t = (point - a).dot(seg) / len_sq;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    Some((point - (a + seg * t)).hypot())
}

/// Closed containment (edges count as inside).
fn rect_contains(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Normalized rectangle spanned by two drag points.
pub fn normalized_rect(a: Point, b: Point) -> Rect {
    Rect::from_points(a, b)
}

/// Axis-aligned bounds of an element. Strokes are not inflated by their width.
pub fn bounds(element: &Element, text_fallback: Size) -> Rect {
    match element {
        Element::Path(path) => match path.points.split_first() {
            Some((first, rest)) => rest
                .iter()
                .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p)),
            None => Rect::ZERO,
        },
        Element::Rectangle(rect) => rect.as_rect(),
        Element::Circle(circle) => Rect::from_center_size(
            circle.center(),
            Size::new(circle.radius * 2.0, circle.radius * 2.0),
        )
        .abs(),
        Element::Line(seg) | Element::Arrow(seg) => Rect::from_points(seg.start(), seg.end()),
        Element::Text(text) => {
            let size = text.box_size().unwrap_or(text_fallback);
            Rect::from_origin_size(text.position(), size).abs()
        }
        Element::EraseRect(erase) => erase.as_rect(),
    }
}

/// Whether `point` hits `element`.
pub fn hits(element: &Element, point: Point, options: &HitTestOptions) -> bool {
    match element {
        Element::Rectangle(rect) => rect_contains(rect.as_rect(), point),
        Element::EraseRect(erase) => rect_contains(erase.as_rect(), point),
        Element::Circle(circle) => (point - circle.center()).hypot() <= circle.radius,
        Element::Text(_) => rect_contains(bounds(element, options.text_fallback), point),
        Element::Path(path) => point_to_polyline_dist(point, &path.points) <= options.tolerance,
        Element::Line(seg) | Element::Arrow(seg) => {
            distance_within_span(point, seg.start(), seg.end()).is_some_and(|d| d <= options.tolerance)
        }
    }
}

/// Topmost element under `point` that also satisfies `predicate`.
pub fn hit_test_matching<'a>(
    elements: &'a [Element],
    point: Point,
    options: &HitTestOptions,
    predicate: impl Fn(&Element) -> bool,
) -> Option<&'a ElementId> {
    // Later elements are on top
    elements
        .iter()
        .rev()
        .find(|&e| predicate(e) && hits(e, point, options))
        .map(Element::id)
}

/// Topmost element under `point`, if any.
pub fn hit_test<'a>(elements: &'a [Element], point: Point, options: &HitTestOptions) -> Option<&'a ElementId> {
    hit_test_matching(elements, point, options, |_| true)
}

/// A copy of `element` moved by `delta`. The id is preserved.
pub fn translate(element: &Element, delta: Vec2) -> Element {
    let mut moved = element.clone();
    match &mut moved {
        Element::Path(path) => {
            for p in &mut path.points {
                *p += delta;
            }
        }
        Element::Rectangle(rect) => {
            rect.x += delta.x;
            rect.y += delta.y;
        }
        Element::Circle(circle) => {
            circle.x += delta.x;
            circle.y += delta.y;
        }
        Element::Line(seg) | Element::Arrow(seg) => {
            seg.x1 += delta.x;
            seg.y1 += delta.y;
            seg.x2 += delta.x;
            seg.y2 += delta.y;
        }
        Element::Text(text) => {
            text.x += delta.x;
            text.y += delta.y;
        }
        Element::EraseRect(erase) => {
            erase.x += delta.x;
            erase.y += delta.y;
        }
    }
    moved
}

/// The two wing tips of an arrowhead pointing at `to`.
pub fn arrow_head(from: Point, to: Point) -> [Point; 2] {
    let angle = (to.y - from.y).atan2(to.x - from.x);
    let wing = |offset: f64| {
        let a = angle + offset;
        to - Vec2::new(a.cos(), a.sin()) * ARROW_HEAD_LENGTH
    };
    [wing(-ARROW_HEAD_ANGLE), wing(ARROW_HEAD_ANGLE)]
}

/// Finite coordinates and non-negative extents.
pub fn is_well_formed(element: &Element) -> bool {
    let finite = |values: &[f64]| values.iter().all(|v| v.is_finite());
    match element {
        Element::Path(path) => {
            finite(&[path.width]) && path.width >= 0.0 && path.points.iter().all(|p| p.is_finite())
        }
        Element::Rectangle(rect) => {
            finite(&[rect.x, rect.y, rect.width, rect.height, rect.line_width])
                && rect.width >= 0.0
                && rect.height >= 0.0
        }
        Element::Circle(circle) => {
            finite(&[circle.x, circle.y, circle.radius, circle.line_width]) && circle.radius >= 0.0
        }
        Element::Line(seg) | Element::Arrow(seg) => finite(&[seg.x1, seg.y1, seg.x2, seg.y2, seg.width]),
        Element::Text(text) => {
            finite(&[text.x, text.y, text.font_size])
                && text.width.is_none_or(|w| w.is_finite() && w >= 0.0)
                && text.height.is_none_or(|h| h.is_finite() && h >= 0.0)
        }
        Element::EraseRect(erase) => {
            finite(&[erase.x, erase.y, erase.width, erase.height]) && erase.width >= 0.0 && erase.height >= 0.0
        }
    }
}
