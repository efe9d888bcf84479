//! Region-of-interest geometry: a 2-D polygon with an even-odd containment
//! query.
//!
//! Containment uses the classic ray-cast parity test over the vertex list.
//! Behavior for points exactly on an edge or vertex is unspecified; callers
//! must not rely on a particular answer for boundary points.

use std::fmt;

/// A 2-D point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Point2 { x, y }
    }
}

/// An immutable polygon over an ordered vertex sequence.
///
/// The vertex order defines the edges; the last vertex closes back to the
/// first. No validation is performed: degenerate or self-intersecting vertex
/// lists are accepted and queried with the same parity rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point2>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point2>) -> Self {
        Polygon { vertices }
    }

    /// Build from `(x, y)` pairs.
    pub fn from_xy<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Polygon {
            vertices: points
                .into_iter()
                .map(|(x, y)| Point2::new(x, y))
                .collect(),
        }
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Even-odd containment test.
    ///
    /// Returns whether `point` lies inside the polygon by ray-cast parity.
    /// Boundary points (exactly on an edge or vertex) are unspecified.
    pub fn contains(&self, point: Point2) -> bool {
        let v = &self.vertices;
        let n = v.len();
        if n == 0 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (vi, vj) = (v[i], v[j]);
            // Unequal y-comparisons guarantee vi.y != vj.y below.
            if (vi.y > point.y) != (vj.y > point.y) {
                let x_cross = (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x;
                if point.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon")?;
        for (i, v) in self.vertices.iter().enumerate() {
            write!(f, "\nVertex {}: {}, {}", i, v.x, v.y)?;
        }
        Ok(())
    }
}
