use flate2::read::GzDecoder;
use json::JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use crate::cells::{points_to_json, Cell, CellTable, Point};
use crate::error::{Error, Result};
use crate::geometry::{mean_coord, octagon, octagon_points};

pub const UNASSIGNED: u32 = u32::MAX;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Molecule {
    pub x: f64,
    pub y: f64,
    pub gene: u32,
    /// Index into `MoleculeTable::cell_names`, or `UNASSIGNED`.
    pub cell: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoleculeColumns {
    pub cell: String,
    pub gene: String,
    pub x: String,
    pub y: String,
}

impl Default for MoleculeColumns {
    fn default() -> Self {
        MoleculeColumns {
            cell: "cell".to_string(),
            gene: "gene".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoleculeTable {
    pub gene_names: Vec<String>,
    pub cell_names: Vec<String>,
    pub molecules: Vec<Molecule>,
}

fn find_column(headers: &csv::StringRecord, column: &str, source_name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|x| x == column)
        .ok_or_else(|| Error::invalid_input(source_name, format!("column '{column}' not found")))
}

fn parse_coordinate(value: &str, row: usize, source_name: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        Error::invalid_input(
            source_name,
            format!("row {row}: '{value}' is not a coordinate"),
        )
    })
}

/// Read molecules from a CSV file, gzip-compressed if the name ends in `.gz`.
pub fn read_molecules_csv(path: &str, columns: &MoleculeColumns) -> Result<MoleculeTable> {
    let file = File::open(path)?;
    if path.ends_with(".gz") {
        read_molecules(GzDecoder::new(file), columns, path)
    } else {
        read_molecules(file, columns, path)
    }
}

/// Rows with an empty cell column are kept as unassigned molecules.
pub fn read_molecules<R: Read>(
    input: R,
    columns: &MoleculeColumns,
    source_name: &str,
) -> Result<MoleculeTable> {
    let mut rdr = csv::Reader::from_reader(input);

    let headers = rdr.headers()?;
    let cell_col = find_column(headers, &columns.cell, source_name)?;
    let gene_col = find_column(headers, &columns.gene, source_name)?;
    let x_col = find_column(headers, &columns.x, source_name)?;
    let y_col = find_column(headers, &columns.y, source_name)?;

    let mut table = MoleculeTable::default();
    let mut gene_name_map: HashMap<String, usize> = HashMap::new();
    let mut cell_name_map: HashMap<String, usize> = HashMap::new();

    for (i, result) in rdr.records().enumerate() {
        let row = result?;

        let gene_name = &row[gene_col];
        let gene = if let Some(gene) = gene_name_map.get(gene_name) {
            *gene
        } else {
            table.gene_names.push(gene_name.to_string());
            gene_name_map.insert(gene_name.to_string(), table.gene_names.len() - 1);
            table.gene_names.len() - 1
        };

        let cell_name = row[cell_col].trim();
        let cell = if cell_name.is_empty() {
            UNASSIGNED
        } else if let Some(cell) = cell_name_map.get(cell_name) {
            *cell as u32
        } else {
            table.cell_names.push(cell_name.to_string());
            cell_name_map.insert(cell_name.to_string(), table.cell_names.len() - 1);
            (table.cell_names.len() - 1) as u32
        };

        table.molecules.push(Molecule {
            x: parse_coordinate(&row[x_col], i + 1, source_name)?,
            y: parse_coordinate(&row[y_col], i + 1, source_name)?,
            gene: gene as u32,
            cell,
        });
    }

    log::info!(
        "Read {} molecules of {} genes in {} cells from {}",
        table.molecules.len(),
        table.gene_names.len(),
        table.cell_names.len(),
        source_name
    );

    Ok(table)
}

/// One cell per assigned cell name: centroid at the mean molecule position,
/// octagon of the molecule positions as its boundary (left empty for fewer
/// than three molecules), and molecule counts as gene levels.
pub fn cells_from_molecules(molecules: &MoleculeTable) -> Result<CellTable> {
    let ncells = molecules.cell_names.len();
    let mut positions: Vec<Vec<Point>> = vec![Vec::new(); ncells];
    let mut counts: Vec<Vec<(u32, u32)>> = vec![Vec::new(); ncells];

    for molecule in &molecules.molecules {
        if molecule.cell == UNASSIGNED {
            continue;
        }
        let c = molecule.cell as usize;
        positions[c].push((molecule.x, molecule.y));
        match counts[c].iter_mut().find(|(gene, _)| *gene == molecule.gene) {
            Some((_, count)) => *count += 1,
            None => counts[c].push((molecule.gene, 1)),
        }
    }

    let mut table = CellTable::new();
    for (c, name) in molecules.cell_names.iter().enumerate() {
        let mut cell = Cell::new(name.as_str());
        cell.xy = Some(mean_coord(positions[c].as_slice())?);
        if positions[c].len() >= 3 {
            cell.poly = octagon_points(&octagon(positions[c].as_slice())?);
        }
        for &(gene, count) in &counts[c] {
            cell.set_gene(&molecules.gene_names[gene as usize], count as f64);
        }
        table.insert(cell);
    }

    Ok(table)
}

/// Molecule positions grouped by gene, genes in first-occurrence order.
pub fn molecules_by_gene(molecules: &MoleculeTable) -> Vec<(String, Vec<Point>)> {
    let mut by_gene: Vec<(String, Vec<Point>)> = molecules
        .gene_names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    for molecule in &molecules.molecules {
        by_gene[molecule.gene as usize].1.push((molecule.x, molecule.y));
    }

    by_gene
}

pub fn molecules_to_json(by_gene: &[(String, Vec<Point>)]) -> JsonValue {
    let mut data = JsonValue::new_object();
    for (gene, points) in by_gene {
        data[gene.as_str()] = points_to_json(points);
    }
    data
}
