// Ward hierarchical clustering over Euclidean distances.
//
// Merges are found with the nearest-neighbor chain algorithm, sorted by
// distance (stable), then relabeled so that cluster `n + k` is the one formed
// by the k-th merge. The resulting dendrogram and its leaf order are the same
// as the ones produced by the usual scientific python stack.

use ndarray::{ArrayView2, Zip};

#[derive(Clone, Debug, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

// Index of the (i, j) distance in a condensed upper-triangular matrix.
fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// Condensed pairwise Euclidean distances between the rows of `data`.
pub fn pdist(data: ArrayView2<f64>) -> Vec<f64> {
    let n = data.nrows();
    let mut distances = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let d2 = Zip::from(data.row(i))
                .and(data.row(j))
                .fold(0.0, |acc, &a, &b| acc + (a - b) * (a - b));
            distances.push(d2.sqrt());
        }
    }
    distances
}

// Lance-Williams update for Ward's criterion.
fn ward_distance(
    d_xi: f64,
    d_yi: f64,
    d_xy: f64,
    size_x: usize,
    size_y: usize,
    size_i: usize,
) -> f64 {
    let (nx, ny, ni) = (size_x as f64, size_y as f64, size_i as f64);
    let t = 1.0 / (nx + ny + ni);
    ((ni + nx) * t * d_xi * d_xi + (ni + ny) * t * d_yi * d_yi - ni * t * d_xy * d_xy)
        .max(0.0)
        .sqrt()
}

fn nn_chain(mut distances: Vec<f64>, n: usize) -> Vec<Merge> {
    let mut size = vec![1_usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n - 1);

    for _ in 0..(n - 1) {
        if chain.is_empty() {
            let first = size.iter().position(|&s| s > 0).unwrap_or(0);
            chain.push(first);
        }

        let (x, y, current_min) = loop {
            let x = chain[chain.len() - 1];
            let (mut y, mut current_min) = if chain.len() > 1 {
                let y = chain[chain.len() - 2];
                (y, distances[condensed_index(n, x, y)])
            } else {
                (x, f64::INFINITY)
            };

            for i in 0..n {
                if size[i] == 0 || i == x {
                    continue;
                }
                let dist = distances[condensed_index(n, x, i)];
                if dist < current_min {
                    current_min = dist;
                    y = i;
                }
            }

            if chain.len() > 1 && y == chain[chain.len() - 2] {
                break (x, y, current_min);
            }
            chain.push(y);
        };

        chain.truncate(chain.len() - 2);

        let (x, y) = if x > y { (y, x) } else { (x, y) };
        let (nx, ny) = (size[x], size[y]);
        merges.push(Merge {
            left: x,
            right: y,
            distance: current_min,
            size: nx + ny,
        });

        // the merged cluster lives on in slot y
        size[x] = 0;
        size[y] = nx + ny;

        for i in 0..n {
            let ni = size[i];
            if ni == 0 || i == y {
                continue;
            }
            let d_xi = distances[condensed_index(n, i, x)];
            let d_yi = distances[condensed_index(n, i, y)];
            distances[condensed_index(n, i, y)] =
                ward_distance(d_xi, d_yi, current_min, nx, ny, ni);
        }
    }

    merges
}

struct LinkageUnionFind {
    parent: Vec<usize>,
    next_label: usize,
}

impl LinkageUnionFind {
    fn new(n: usize) -> Self {
        LinkageUnionFind {
            parent: (0..(2 * n - 1)).collect(),
            next_label: n,
        }
    }

    fn merge(&mut self, x: usize, y: usize) {
        self.parent[x] = self.next_label;
        self.parent[y] = self.next_label;
        self.next_label += 1;
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut x = x;
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }
}

fn relabel(merges: &mut [Merge], n: usize) {
    let mut uf = LinkageUnionFind::new(n);
    for merge in merges.iter_mut() {
        let x = uf.find(merge.left);
        let y = uf.find(merge.right);
        merge.left = x.min(y);
        merge.right = x.max(y);
        uf.merge(x, y);
    }
}

/// Ward linkage of the rows of `data`. Returns `n - 1` merges, sorted by
/// distance, where merge `k` creates cluster `n + k`.
pub fn ward_linkage(data: ArrayView2<f64>) -> Vec<Merge> {
    let n = data.nrows();
    if n < 2 {
        return Vec::new();
    }

    let mut merges = nn_chain(pdist(data), n);
    merges.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    relabel(&mut merges, n);
    merges
}

/// Left-to-right leaf order of the dendrogram described by `merges`.
pub fn leaves_list(merges: &[Merge], n: usize) -> Vec<usize> {
    if n < 2 || merges.len() != n - 1 {
        return (0..n).collect();
    }

    let mut order = Vec::with_capacity(n);
    let mut stack = vec![2 * n - 2];
    while let Some(node) = stack.pop() {
        if node < n {
            order.push(node);
        } else {
            let merge = &merges[node - n];
            stack.push(merge.right);
            stack.push(merge.left);
        }
    }
    order
}
