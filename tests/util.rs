#![allow(dead_code)]
use mesh_refine::grid::element::Element;
use mesh_refine::grid::level::Level;
use mesh_refine::grid::multigrid::MultiGrid;
use mesh_refine::topology::point::ElemId;
use mesh_refine::topology::shape::ElementShape;

/// n-by-n grid of unit quadrilaterals on the unit-spaced lattice.
pub fn quad_grid(n: usize) -> MultiGrid {
    let mut positions = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            positions.push([i as f64, j as f64]);
        }
    }
    let mut cells = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            let v = |ii: usize, jj: usize| jj * (n + 1) + ii;
            cells.push(vec![v(i, j), v(i + 1, j), v(i + 1, j + 1), v(i, j + 1)]);
        }
    }
    let cell_refs: Vec<(ElementShape, &[usize])> = cells
        .iter()
        .map(|c| (ElementShape::Quadrilateral, c.as_slice()))
        .collect();
    MultiGrid::build_2d(&positions, &cell_refs).unwrap()
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Area of a convex 2-D cell by the shoelace formula.
pub fn cell_area(level: &Level, elem: &Element) -> f64 {
    let pts: Vec<[f64; 3]> = elem
        .corners
        .iter()
        .map(|&c| level.node(c).unwrap().pos)
        .collect();
    let mut twice = 0.0;
    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[(i + 1) % pts.len()];
        twice += a[0] * b[1] - b[0] * a[1];
    }
    twice.abs() * 0.5
}

/// Volume of a convex 3-D cell: cone over every side from the corner
/// centroid, quadrilateral sides split into two triangles.
pub fn cell_volume(level: &Level, elem: &Element) -> f64 {
    let pts: Vec<[f64; 3]> = elem
        .corners
        .iter()
        .map(|&c| level.node(c).unwrap().pos)
        .collect();
    let mut apex = [0.0; 3];
    for p in &pts {
        apex = [apex[0] + p[0], apex[1] + p[1], apex[2] + p[2]];
    }
    let n = pts.len() as f64;
    apex = [apex[0] / n, apex[1] / n, apex[2] / n];

    let mut volume = 0.0;
    for s in 0..elem.shape.side_count() {
        let side = elem.shape.corners_of_side(s);
        for t in 1..side.len() - 1 {
            let a = pts[side[0] as usize];
            let b = pts[side[t] as usize];
            let c = pts[side[t + 1] as usize];
            let v = dot(sub(a, apex), cross(sub(b, apex), sub(c, apex)));
            volume += v.abs() / 6.0;
        }
    }
    volume
}

/// Summed measure of one level, area in 2-D and volume in 3-D.
pub fn level_measure(mg: &MultiGrid, k: usize) -> f64 {
    let level = mg.level(k).unwrap();
    level
        .sorted_elements()
        .iter()
        .map(|&id| {
            let elem = level.element(id).unwrap();
            if mg.dim() == 2 {
                cell_area(level, elem)
            } else {
                cell_volume(level, elem)
            }
        })
        .sum()
}

/// Summed measure of one element's children on the next level.
pub fn family_measure(mg: &MultiGrid, k: usize, id: ElemId) -> f64 {
    let children = mg.level(k).unwrap().element(id).unwrap().children.clone();
    let fine = mg.level(k + 1).unwrap();
    children
        .iter()
        .map(|&c| {
            let elem = fine.element(c).unwrap();
            if mg.dim() == 2 {
                cell_area(fine, elem)
            } else {
                cell_volume(fine, elem)
            }
        })
        .sum()
}

/// Mutual neighbor pairs between two son families on the finer level.
pub fn cross_family_pairs(mg: &MultiGrid, k: usize, a: ElemId, b: ElemId) -> usize {
    let coarse = mg.level(k).unwrap();
    let a_children = coarse.element(a).unwrap().children.clone();
    let b_children = coarse.element(b).unwrap().children.clone();
    let fine = mg.level(k + 1).unwrap();
    let mut pairs = 0;
    for &c in &a_children {
        let elem = fine.element(c).unwrap();
        for nb in elem.neighbors.iter().flatten() {
            if b_children.contains(nb) {
                assert!(
                    fine.element(*nb).unwrap().side_of_neighbor(c).is_some(),
                    "one-way neighbor link between families"
                );
                pairs += 1;
            }
        }
    }
    pairs
}
