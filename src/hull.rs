use nalgebra::Point2;

use crate::coordinate_set::CoordinateSet;

/// Convex hull of a point set with vertices in counter-clockwise order,
/// starting from the lowest-x (then lowest-y) point. Collinear boundary
/// points are not vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvexHull {
    pub vertices: Vec<Point2<f64>>,
    pub area: f64,
}

impl ConvexHull {
    /// Fewer than three distinct points, or all points collinear.
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3 || self.area <= 0.0
    }

    pub fn perimeter(&self) -> f64 {
        let n = self.vertices.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| nalgebra::distance(&self.vertices[i], &self.vertices[(i + 1) % n]))
            .sum()
    }
}

/// Andrew's monotone chain; area by the shoelace formula.
pub fn hull(points: &CoordinateSet) -> ConvexHull {
    let mut sorted: Vec<Point2<f64>> = points.points().to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return ConvexHull {
            vertices: sorted,
            area: 0.0,
        };
    }

    let mut lower: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in sorted.iter() {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    // endpoints are shared between the chains
    lower.pop();
    upper.pop();
    let mut vertices = lower;
    vertices.extend(upper);

    let area = shoelace_area(&vertices);
    ConvexHull { vertices, area }
}

/// z component of `(a - o) x (b - o)`; positive for a left turn.
fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn shoelace_area(vertices: &[Point2<f64>]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (&vertices[i], &vertices[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice.abs() / 2.0
}
