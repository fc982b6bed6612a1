// Compact "map + cells" encodings of per-cell categorical values.
//
// Each distinct value is stored once in `map`, in the order it is first seen
// while walking the cell table, and every cell refers to it by index. The map
// is never sorted.

use itertools::Itertools;
use json::JsonValue;
use std::collections::HashMap;

use crate::cells::CellTable;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct FactorEncoding {
    pub map: Vec<String>,
    pub cells: Vec<(String, usize)>,
}

impl FactorEncoding {
    pub fn value(&self, cell: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(id, _)| id == cell)
            .map(|&(_, i)| self.map[i].as_str())
    }

    pub fn to_json(&self) -> JsonValue {
        let mut cells = JsonValue::new_object();
        for (id, i) in &self.cells {
            cells[id.as_str()] = (*i).into();
        }

        let mut encoding = JsonValue::new_object();
        encoding["map"] = JsonValue::from(self.map.clone());
        encoding["cells"] = cells;
        encoding
    }
}

/// Encode one factor over every cell in the table.
pub fn encode_factor(table: &CellTable, factor_name: &str) -> Result<FactorEncoding> {
    let mut map: Vec<String> = Vec::new();
    let mut value_index: HashMap<&str, usize> = HashMap::new();
    let mut cells = Vec::with_capacity(table.len());

    for cell in table {
        let value = cell
            .factor(factor_name)
            .ok_or_else(|| Error::missing(cell.id(), factor_name))?;

        let i = if let Some(&i) = value_index.get(value) {
            i
        } else {
            map.push(value.to_string());
            value_index.insert(value, map.len() - 1);
            map.len() - 1
        };

        cells.push((cell.id().to_string(), i));
    }

    Ok(FactorEncoding { map, cells })
}

/// Every factor name that appears on any cell, in first-occurrence order.
pub fn factor_names(table: &CellTable) -> Vec<String> {
    table
        .iter()
        .flat_map(|cell| cell.factors.iter().map(|(name, _)| name))
        .unique()
        .cloned()
        .collect()
}

/// Encode every factor present in the table. All cells must carry all of them.
pub fn encode_factors(table: &CellTable) -> Result<Vec<(String, FactorEncoding)>> {
    factor_names(table)
        .into_iter()
        .map(|name| -> Result<(String, FactorEncoding)> {
            let encoding = encode_factor(table, &name)?;
            Ok((name, encoding))
        })
        .collect()
}

pub fn factors_to_json(factors: &[(String, FactorEncoding)]) -> JsonValue {
    let mut data = JsonValue::new_object();
    for (name, encoding) in factors {
        data[name.as_str()] = encoding.to_json();
    }
    data
}

/// Raw expression levels for one gene, along with the largest of them so the
/// viewer can normalize its color scale.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneEncoding {
    pub max: f64,
    pub cells: Vec<(String, f64)>,
}

impl GeneEncoding {
    pub fn to_json(&self) -> JsonValue {
        let mut cells = JsonValue::new_object();
        for (id, level) in &self.cells {
            cells[id.as_str()] = (*level).into();
        }

        let mut encoding = JsonValue::new_object();
        encoding["max"] = self.max.into();
        encoding["cells"] = cells;
        encoding
    }
}

/// Per-gene encodings, genes in first-occurrence order. Cells that don't
/// report a gene are simply absent from that gene's `cells`.
pub fn encode_genes(table: &CellTable) -> Vec<(String, GeneEncoding)> {
    let mut genes: Vec<(String, GeneEncoding)> = Vec::new();
    let mut gene_index: HashMap<String, usize> = HashMap::new();

    for cell in table {
        for (gene, level) in &cell.genes {
            let level = *level;
            let i = if let Some(&i) = gene_index.get(gene) {
                i
            } else {
                genes.push((
                    gene.clone(),
                    GeneEncoding {
                        max: f64::NEG_INFINITY,
                        cells: Vec::new(),
                    },
                ));
                gene_index.insert(gene.clone(), genes.len() - 1);
                genes.len() - 1
            };

            let encoding = &mut genes[i].1;
            encoding.max = encoding.max.max(level);
            encoding.cells.push((cell.id().to_string(), level));
        }
    }

    genes
}

pub fn genes_to_json(genes: &[(String, GeneEncoding)]) -> JsonValue {
    let mut data = JsonValue::new_object();
    for (gene, encoding) in genes {
        data[gene.as_str()] = encoding.to_json();
    }
    data
}
