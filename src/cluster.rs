pub mod linkage;

use json::JsonValue;
use ndarray::{Array2, ArrayView2, Axis};
use std::collections::HashMap;

use crate::cells::CellTable;
use crate::error::{Error, Result};
use crate::transform::round_to;
use linkage::{leaves_list, ward_linkage};

/// Heatmap-ready matrix: `matrix[[i, j]]` is the value at `(rows[i], cols[j])`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusteredMatrix {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub matrix: Array2<f64>,
}

impl ClusteredMatrix {
    pub fn to_json(&self) -> JsonValue {
        let mut out = JsonValue::new_object();
        out["rows"] = JsonValue::from(self.rows.clone());
        out["cols"] = JsonValue::from(self.cols.clone());
        out["matrix"] = JsonValue::from(
            self.matrix
                .rows()
                .into_iter()
                .map(|row| JsonValue::from(row.to_vec()))
                .collect::<Vec<_>>(),
        );
        out
    }
}

/// Genes by cells expression matrix. Genes appear in first-occurrence order,
/// cells in table order, and a gene a cell doesn't report counts as 0.
pub fn expression_matrix(table: &CellTable) -> (Vec<String>, Vec<String>, Array2<f64>) {
    let mut genes: Vec<String> = Vec::new();
    let mut gene_index: HashMap<&str, usize> = HashMap::new();
    for cell in table {
        for (gene, _) in &cell.genes {
            if !gene_index.contains_key(gene.as_str()) {
                gene_index.insert(gene.as_str(), genes.len());
                genes.push(gene.clone());
            }
        }
    }

    let cells: Vec<String> = table.ids().map(|id| id.to_string()).collect();
    let mut matrix = Array2::<f64>::zeros((genes.len(), cells.len()));
    for (j, cell) in table.iter().enumerate() {
        for (gene, level) in &cell.genes {
            matrix[[gene_index[gene.as_str()], j]] = *level;
        }
    }

    (genes, cells, matrix)
}

/// Permutation of the rows of `data` given by the leaf order of their Ward
/// dendrogram. Fewer than two rows are returned in place.
pub fn order_rows(data: ArrayView2<f64>) -> Vec<usize> {
    let n = data.nrows();
    if n < 2 {
        return (0..n).collect();
    }
    leaves_list(&ward_linkage(data), n)
}

/// Reorder `matrix` by clustering its rows and its columns independently.
pub fn cluster_matrix(
    rows: Vec<String>,
    cols: Vec<String>,
    matrix: Array2<f64>,
) -> Result<ClusteredMatrix> {
    if matrix.nrows() != rows.len() || matrix.ncols() != cols.len() {
        return Err(Error::InconsistentShape(format!(
            "matrix is {}x{} but there are {} row labels and {} column labels",
            matrix.nrows(),
            matrix.ncols(),
            rows.len(),
            cols.len()
        )));
    }

    if let Some(((i, j), value)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::invalid_input(
            "expression matrix",
            format!("non-finite value {value} at ({}, {})", rows[i], cols[j]),
        ));
    }

    let (row_order, col_order) = rayon::join(
        || order_rows(matrix.view()),
        || order_rows(matrix.t()),
    );

    let matrix = matrix
        .select(Axis(0), &row_order)
        .select(Axis(1), &col_order);

    Ok(ClusteredMatrix {
        rows: row_order.iter().map(|&i| rows[i].clone()).collect(),
        cols: col_order.iter().map(|&j| cols[j].clone()).collect(),
        matrix,
    })
}

/// Genes by cells matrix of the table, rows and columns in dendrogram order.
pub fn cluster(table: &CellTable) -> Result<ClusteredMatrix> {
    let (genes, cells, matrix) = expression_matrix(table);
    log::debug!(
        "Clustering {} genes across {} cells",
        genes.len(),
        cells.len()
    );
    cluster_matrix(genes, cells, matrix)
}

/// Divide every entry by the matrix maximum and round to `digits` decimals.
/// A matrix whose maximum isn't positive is left alone.
pub fn normalize_to_max(matrix: &mut Array2<f64>, digits: u32) {
    let max = matrix.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return;
    }
    matrix.mapv_inplace(|v| round_to(v / max, digits));
}
