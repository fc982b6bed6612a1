use itertools::Itertools;
use json::JsonValue;
use petgraph::graph::{NodeIndex, UnGraph};
use spade::{DelaunayTriangulation, HasPosition, Point2, Triangulation};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::cells::{points_to_json, CellTable, Point};
use crate::error::{Error, Result};

pub const KEY_SEPARATOR: &str = "::";

struct IndexedVertex {
    position: Point2<f64>,
    index: usize,
}

impl HasPosition for IndexedVertex {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

fn check_triangulation_input(points: &[Point]) -> Result<()> {
    if points.len() < 3 {
        return Err(Error::MalformedGeometry(format!(
            "triangulation needs at least 3 points, got {}",
            points.len()
        )));
    }

    let mut seen = HashSet::with_capacity(points.len());
    for &(x, y) in points {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::MalformedGeometry(format!(
                "cannot triangulate non-finite point ({x}, {y})"
            )));
        }
        // adding 0.0 folds -0.0 into 0.0 so they compare equal bitwise
        if !seen.insert(((x + 0.0).to_bits(), (y + 0.0).to_bits())) {
            return Err(Error::MalformedGeometry(format!(
                "duplicate point ({x}, {y}) in triangulation input"
            )));
        }
    }

    Ok(())
}

/// Delaunay triangulation of `points`, returned as index triples in
/// counter-clockwise order.
///
/// Fails rather than silently dropping input when there are fewer than three
/// points, any duplicates, or when every point lies on one line.
pub fn triangulate(points: &[Point]) -> Result<Vec<[usize; 3]>> {
    check_triangulation_input(points)?;

    let vertices = points
        .iter()
        .enumerate()
        .map(|(index, &(x, y))| IndexedVertex {
            position: Point2::new(x, y),
            index,
        })
        .collect::<Vec<_>>();

    let triangulation: DelaunayTriangulation<IndexedVertex> =
        DelaunayTriangulation::bulk_load(vertices).map_err(|err| {
            Error::MalformedGeometry(format!("triangulation rejected input: {err:?}"))
        })?;

    if triangulation.num_vertices() != points.len() {
        return Err(Error::MalformedGeometry(format!(
            "triangulation kept {} of {} points",
            triangulation.num_vertices(),
            points.len()
        )));
    }

    if triangulation.num_inner_faces() == 0 {
        return Err(Error::MalformedGeometry(
            "all points are collinear".to_string(),
        ));
    }

    Ok(triangulation
        .inner_faces()
        .map(|face| {
            let [a, b, c] = face.vertices();
            [a.data().index, b.data().index, c.data().index]
        })
        .collect())
}

fn lexicographic_cmp(a: Point, b: Point) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

// Rotate a counter-clockwise triple so that it starts at its lexicographically
// smallest point. Input points are distinct, so this is unique.
fn canonical_rotation(triangle: [usize; 3], points: &[Point]) -> [usize; 3] {
    let first = (0..3)
        .min_by(|&i, &j| lexicographic_cmp(points[triangle[i]], points[triangle[j]]))
        .unwrap_or(0);
    [
        triangle[first],
        triangle[(first + 1) % 3],
        triangle[(first + 2) % 3],
    ]
}

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle {
    pub key: String,
    pub cells: [String; 3],
    pub poly: [Point; 3],
}

impl Triangle {
    pub fn contains(&self, cell: &str) -> bool {
        self.cells.iter().any(|c| c == cell)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighborhoods {
    /// Sorted by key.
    pub triangles: Vec<Triangle>,
}

impl Neighborhoods {
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Triangle> {
        self.triangles
            .binary_search_by(|t| t.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.triangles[i])
    }

    /// Cells sharing a triangle with `cell`, sorted.
    pub fn neighbors(&self, cell: &str) -> Vec<&str> {
        self.triangles
            .iter()
            .filter(|t| t.contains(cell))
            .flat_map(|t| t.cells.iter().map(|c| c.as_str()))
            .filter(|&c| c != cell)
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Undirected adjacency graph with one edge per triangle side.
    pub fn neighbor_graph(&self) -> UnGraph<String, ()> {
        let mut graph = UnGraph::default();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for triangle in &self.triangles {
            let mut idx = [NodeIndex::end(); 3];
            for (i, cell) in triangle.cells.iter().enumerate() {
                idx[i] = *nodes
                    .entry(cell.as_str())
                    .or_insert_with(|| graph.add_node(cell.clone()));
            }

            graph.update_edge(idx[0], idx[1], ());
            graph.update_edge(idx[1], idx[2], ());
            graph.update_edge(idx[2], idx[0], ());
        }

        graph
    }

    pub fn to_json(&self) -> JsonValue {
        let mut data = JsonValue::new_object();
        for triangle in &self.triangles {
            let mut entry = JsonValue::new_object();
            entry["poly"] = points_to_json(&triangle.poly);
            data[triangle.key.as_str()] = entry;
        }
        data
    }
}

/// Triangulate the (already transformed) centroids of every cell.
pub fn build_neighborhoods(table: &CellTable) -> Result<Neighborhoods> {
    let ids: Vec<&str> = table.ids().collect();
    let points = table
        .iter()
        .map(|cell| cell.require_xy())
        .collect::<Result<Vec<Point>>>()?;

    let mut triangles = triangulate(&points)?
        .into_iter()
        .map(|triangle| {
            let [a, b, c] = canonical_rotation(triangle, &points);
            let cells = [ids[a].to_string(), ids[b].to_string(), ids[c].to_string()];
            Triangle {
                key: cells.join(KEY_SEPARATOR),
                cells,
                poly: [points[a], points[b], points[c]],
            }
        })
        .collect::<Vec<_>>();

    triangles.sort_unstable_by(|a, b| a.key.cmp(&b.key));

    log::debug!(
        "Triangulated {} cells into {} triangles",
        points.len(),
        triangles.len()
    );

    Ok(Neighborhoods { triangles })
}
