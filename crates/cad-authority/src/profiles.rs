//! Closed-region detection for mock sketches.
//!
//! Circles and closed splines are loops on their own. Lines, arcs and open
//! splines are joined end to end; a connected group where every junction
//! has exactly two curves is a loop. A loop nested in another becomes a
//! hole of its parent and a profile of its own.

use std::f64::consts::TAU;

use profile_synth::{PlanarCurve, Point2};

/// Junction snapping distance, internal units.
const JOIN_EPS: f64 = 1e-6;

/// Polygon samples per full turn when flattening circles and arcs.
const SAMPLES_PER_TURN: usize = 64;

/// A closed chain of sketch curves.
#[derive(Debug, Clone)]
pub(crate) struct SketchLoop {
    /// Indices into the sketch's curve list, in walking order.
    pub curves: Vec<usize>,
    /// Junction points between consecutive curves. Empty for loops made of
    /// a single closed curve.
    pub corners: Vec<Point2>,
    /// Length of each curve, parallel to `curves`.
    pub lengths: Vec<f64>,
    pub polygon: Vec<Point2>,
    pub area: f64,
    pub perimeter: f64,
    pub centroid: Point2,
}

/// One closed region: an outer loop minus the loops directly inside it.
#[derive(Debug, Clone)]
pub(crate) struct ProfileShape {
    pub outer: SketchLoop,
    pub holes: Vec<SketchLoop>,
    /// Index of the outermost loop enclosing this region. Regions sharing
    /// a root are one connected piece when extruded together.
    pub root: usize,
    pub area: f64,
    pub perimeter: f64,
    pub centroid: Point2,
}

impl ProfileShape {
    /// Every loop bounding the region, outer first.
    pub fn loops(&self) -> impl Iterator<Item = &SketchLoop> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }
}

/// Find the profiles bounded by `curves`. Construction curves and points
/// are ignored.
pub(crate) fn find_profiles(curves: &[(PlanarCurve, bool)]) -> Vec<ProfileShape> {
    let loops = find_loops(curves);
    if loops.is_empty() {
        return Vec::new();
    }

    // Parent of each loop is the smallest larger loop containing it.
    let parent: Vec<Option<usize>> = (0..loops.len())
        .map(|i| {
            let probe = loops[i].polygon[0];
            (0..loops.len())
                .filter(|&j| j != i && loops[j].area > loops[i].area)
                .filter(|&j| point_in_polygon(probe, &loops[j].polygon))
                .min_by(|&a, &b| {
                    loops[a]
                        .area
                        .partial_cmp(&loops[b].area)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        })
        .collect();

    (0..loops.len())
        .map(|i| {
            let holes: Vec<SketchLoop> = (0..loops.len())
                .filter(|&j| parent[j] == Some(i))
                .map(|j| loops[j].clone())
                .collect();
            let mut root = i;
            while let Some(p) = parent[root] {
                root = p;
            }
            let hole_area: f64 = holes.iter().map(|h| h.area).sum();
            let area = loops[i].area - hole_area;
            let perimeter = loops[i].perimeter + holes.iter().map(|h| h.perimeter).sum::<f64>();
            let centroid = if area > 0.0 {
                let mut c = [
                    loops[i].centroid[0] * loops[i].area,
                    loops[i].centroid[1] * loops[i].area,
                ];
                for h in &holes {
                    c[0] -= h.centroid[0] * h.area;
                    c[1] -= h.centroid[1] * h.area;
                }
                [c[0] / area, c[1] / area]
            } else {
                loops[i].centroid
            };
            ProfileShape {
                outer: loops[i].clone(),
                holes,
                root,
                area,
                perimeter,
                centroid,
            }
        })
        .collect()
}

fn find_loops(curves: &[(PlanarCurve, bool)]) -> Vec<SketchLoop> {
    let mut loops = Vec::new();

    // Self-closed curves.
    for (index, (curve, construction)) in curves.iter().enumerate() {
        if *construction {
            continue;
        }
        let polygon = match curve {
            PlanarCurve::Circle { center, radius } => circle_polygon(*center, *radius),
            PlanarCurve::Spline {
                fit_points,
                closed: true,
            } if fit_points.len() >= 3 => fit_points.clone(),
            _ => continue,
        };
        if let Some(l) = make_loop(vec![index], Vec::new(), vec![curve.length()], polygon) {
            loops.push(l);
        }
    }

    // Chains of open curves.
    let mut nodes: Vec<Point2> = Vec::new();
    let mut edges: Vec<(usize, usize, usize)> = Vec::new();
    for (index, (curve, construction)) in curves.iter().enumerate() {
        if *construction {
            continue;
        }
        if let Some((a, b)) = curve.endpoints() {
            let na = node_for(&mut nodes, a);
            let nb = node_for(&mut nodes, b);
            edges.push((na, nb, index));
        }
    }

    let mut degree = vec![0usize; nodes.len()];
    for &(a, b, _) in &edges {
        degree[a] += 1;
        degree[b] += 1;
    }

    let mut used = vec![false; edges.len()];
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let group = connected_edges(&edges, start);
        for &e in &group {
            used[e] = true;
        }
        let closed = group.iter().all(|&e| {
            let (a, b, _) = edges[e];
            degree[a] == 2 && degree[b] == 2
        });
        if !closed {
            continue;
        }
        if let Some(l) = walk_loop(curves, &nodes, &edges, &group) {
            loops.push(l);
        }
    }

    loops.sort_by_key(|l| l.curves.iter().copied().min().unwrap_or(usize::MAX));
    loops
}

fn node_for(nodes: &mut Vec<Point2>, p: Point2) -> usize {
    if let Some(i) = nodes
        .iter()
        .position(|n| (n[0] - p[0]).abs() < JOIN_EPS && (n[1] - p[1]).abs() < JOIN_EPS)
    {
        return i;
    }
    nodes.push(p);
    nodes.len() - 1
}

/// Edges reachable from `start` through shared nodes.
fn connected_edges(edges: &[(usize, usize, usize)], start: usize) -> Vec<usize> {
    let mut group = vec![start];
    let mut frontier = vec![start];
    while let Some(e) = frontier.pop() {
        let (a, b, _) = edges[e];
        for (i, &(c, d, _)) in edges.iter().enumerate() {
            if group.contains(&i) {
                continue;
            }
            if c == a || c == b || d == a || d == b {
                group.push(i);
                frontier.push(i);
            }
        }
    }
    group.sort_unstable();
    group
}

/// Walk a group in which every node has degree two.
fn walk_loop(
    curves: &[(PlanarCurve, bool)],
    nodes: &[Point2],
    edges: &[(usize, usize, usize)],
    group: &[usize],
) -> Option<SketchLoop> {
    let first = group[0];
    let (start_node, mut at, _) = edges[first];
    let mut order = vec![(first, true)];
    let mut visited = vec![first];

    while at != start_node {
        let next = group.iter().copied().find(|&e| {
            !visited.contains(&e) && (edges[e].0 == at || edges[e].1 == at)
        })?;
        let forward = edges[next].0 == at;
        at = if forward { edges[next].1 } else { edges[next].0 };
        order.push((next, forward));
        visited.push(next);
    }
    if visited.len() != group.len() {
        return None;
    }

    let mut polygon = Vec::new();
    let mut corners = Vec::new();
    let mut lengths = Vec::new();
    for &(e, forward) in &order {
        let (a, b, index) = edges[e];
        corners.push(nodes[if forward { a } else { b }]);
        let curve = &curves[index].0;
        lengths.push(curve.length());
        let mut pts = sample_open(curve);
        if !forward {
            pts.reverse();
        }
        pts.pop();
        polygon.extend(pts);
    }
    let curve_ids = order.iter().map(|&(e, _)| edges[e].2).collect();
    make_loop(curve_ids, corners, lengths, polygon)
}

fn make_loop(
    curves: Vec<usize>,
    corners: Vec<Point2>,
    lengths: Vec<f64>,
    polygon: Vec<Point2>,
) -> Option<SketchLoop> {
    if polygon.len() < 3 {
        return None;
    }
    let (signed, centroid) = signed_area_centroid(&polygon);
    if signed.abs() < 1e-12 {
        return None;
    }
    let perimeter = lengths.iter().sum::<f64>();
    Some(SketchLoop {
        curves,
        corners,
        lengths,
        polygon,
        area: signed.abs(),
        perimeter,
        centroid,
    })
}

/// Points along any curve, in drawing order. Circles start and end at
/// angle zero.
pub(crate) fn curve_points(curve: &PlanarCurve) -> Vec<Point2> {
    match curve {
        PlanarCurve::Circle { center, radius } => {
            let mut pts = circle_polygon(*center, *radius);
            pts.push(pts[0]);
            pts
        }
        PlanarCurve::Spline {
            fit_points,
            closed: true,
        } if !fit_points.is_empty() => {
            let mut pts = fit_points.clone();
            pts.push(fit_points[0]);
            pts
        }
        PlanarCurve::Point { at } => vec![*at],
        other => sample_open(other),
    }
}

/// Points along an open curve from its first endpoint to its last.
fn sample_open(curve: &PlanarCurve) -> Vec<Point2> {
    match curve {
        PlanarCurve::Line { start, end } => vec![*start, *end],
        PlanarCurve::Arc {
            center,
            radius,
            start_angle,
            sweep,
        } => {
            let n = ((sweep.abs() / TAU) * SAMPLES_PER_TURN as f64).ceil().max(2.0) as usize;
            (0..=n)
                .map(|i| {
                    let a = start_angle + sweep * i as f64 / n as f64;
                    [center[0] + radius * a.cos(), center[1] + radius * a.sin()]
                })
                .collect()
        }
        PlanarCurve::Spline { fit_points, .. } => fit_points.clone(),
        PlanarCurve::Circle { .. } | PlanarCurve::Point { .. } => Vec::new(),
    }
}

fn circle_polygon(center: Point2, radius: f64) -> Vec<Point2> {
    (0..SAMPLES_PER_TURN)
        .map(|i| {
            let a = TAU * i as f64 / SAMPLES_PER_TURN as f64;
            [center[0] + radius * a.cos(), center[1] + radius * a.sin()]
        })
        .collect()
}

/// Signed shoelace area and area centroid of a closed polygon.
fn signed_area_centroid(pts: &[Point2]) -> (f64, Point2) {
    let n = pts.len();
    let mut a = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = pts[i];
        let q = pts[(i + 1) % n];
        let cross = p[0] * q[1] - q[0] * p[1];
        a += cross;
        cx += (p[0] + q[0]) * cross;
        cy += (p[1] + q[1]) * cross;
    }
    let a = a / 2.0;
    if a.abs() < 1e-15 {
        return (0.0, pts[0]);
    }
    (a, [cx / (6.0 * a), cy / (6.0 * a)])
}

fn point_in_polygon(p: Point2, poly: &[Point2]) -> bool {
    let mut inside = false;
    let n = poly.len();
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (poly[i], poly[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0];
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn open(curves: Vec<PlanarCurve>) -> Vec<(PlanarCurve, bool)> {
        curves.into_iter().map(|c| (c, false)).collect()
    }

    fn square(size: f64) -> Vec<PlanarCurve> {
        let h = size / 2.0;
        vec![
            PlanarCurve::line([-h, -h], [h, -h]),
            PlanarCurve::line([h, -h], [h, h]),
            PlanarCurve::line([h, h], [-h, h]),
            PlanarCurve::line([-h, h], [-h, -h]),
        ]
    }

    #[test]
    fn rectangle_is_one_profile() {
        let profiles = find_profiles(&open(square(2.0)));
        assert_eq!(profiles.len(), 1);
        assert_relative_eq!(profiles[0].area, 4.0, epsilon = 1e-9);
        assert_relative_eq!(profiles[0].perimeter, 8.0, epsilon = 1e-9);
        assert_eq!(profiles[0].outer.corners.len(), 4);
    }

    #[test]
    fn reversed_segments_still_close() {
        let mut curves = square(2.0);
        curves[1] = PlanarCurve::line([1.0, 1.0], [1.0, -1.0]);
        assert_eq!(find_profiles(&open(curves)).len(), 1);
    }

    #[test]
    fn open_chain_has_no_profile() {
        let mut curves = square(2.0);
        curves.pop();
        assert!(find_profiles(&open(curves)).is_empty());
    }

    #[test]
    fn circle_inside_square_makes_two_profiles() {
        let mut curves = square(4.0);
        curves.push(PlanarCurve::circle([0.0, 0.0], 1.0));
        let profiles = find_profiles(&open(curves));
        assert_eq!(profiles.len(), 2);

        let total: f64 = profiles.iter().map(|p| p.area).sum();
        assert_relative_eq!(total, 16.0, epsilon = 1e-9);
        assert!(profiles.iter().all(|p| p.root == profiles[0].root));
        let ring = profiles.iter().find(|p| !p.holes.is_empty()).unwrap();
        assert!(ring.area < 16.0 - 3.0);
    }

    #[test]
    fn construction_curves_are_ignored() {
        let curves: Vec<(PlanarCurve, bool)> = square(2.0).into_iter().map(|c| (c, true)).collect();
        assert!(find_profiles(&curves).is_empty());
    }

    #[test]
    fn disjoint_circles_have_distinct_roots() {
        let curves = open(vec![
            PlanarCurve::circle([0.0, 0.0], 1.0),
            PlanarCurve::circle([5.0, 0.0], 1.0),
        ]);
        let profiles = find_profiles(&curves);
        assert_eq!(profiles.len(), 2);
        assert_ne!(profiles[0].root, profiles[1].root);
    }
}
