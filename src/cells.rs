use json::JsonValue;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A 2D coordinate in whatever space the cell table currently lives in.
pub type Point = (f64, f64);

// Cells carry a handful of named attributes. We keep them as ordered
// (name, value) pairs so that serialized output is stable from run to run.
pub type Attributes<V> = Vec<(String, V)>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    id: String,
    pub xy: Option<Point>,
    pub poly: Vec<Point>,
    pub genes: Attributes<f64>,
    pub factors: Attributes<String>,
    pub mappings: Attributes<Point>,
}

fn get_attribute<'a, V>(attributes: &'a Attributes<V>, name: &str) -> Option<&'a V> {
    attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

fn set_attribute<V>(attributes: &mut Attributes<V>, name: &str, value: V) {
    if let Some(entry) = attributes.iter_mut().find(|(k, _)| k == name) {
        entry.1 = value;
    } else {
        attributes.push((name.to_string(), value));
    }
}

impl Cell {
    pub fn new(id: impl Into<String>) -> Self {
        Cell {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gene(&self, gene: &str) -> Option<f64> {
        get_attribute(&self.genes, gene).copied()
    }

    pub fn factor(&self, factor: &str) -> Option<&str> {
        get_attribute(&self.factors, factor).map(|v| v.as_str())
    }

    pub fn mapping(&self, name: &str) -> Option<Point> {
        get_attribute(&self.mappings, name).copied()
    }

    pub fn set_gene(&mut self, gene: &str, level: f64) {
        set_attribute(&mut self.genes, gene, level);
    }

    pub fn set_factor(&mut self, factor: &str, value: impl Into<String>) {
        set_attribute(&mut self.factors, factor, value.into());
    }

    pub fn set_mapping(&mut self, name: &str, xy: Point) {
        set_attribute(&mut self.mappings, name, xy);
    }

    /// Centroid, or a `MissingAttribute` error naming this cell.
    pub fn require_xy(&self) -> Result<Point> {
        self.xy.ok_or_else(|| Error::missing(&self.id, "xy"))
    }

    pub fn to_json(&self) -> JsonValue {
        let mut mappings = JsonValue::new_object();
        for (name, xy) in &self.mappings {
            mappings[name.as_str()] = point_to_json(*xy);
        }

        let mut genes = JsonValue::new_object();
        for (gene, level) in &self.genes {
            genes[gene.as_str()] = (*level).into();
        }

        let mut factors = JsonValue::new_object();
        for (factor, value) in &self.factors {
            factors[factor.as_str()] = value.as_str().into();
        }

        let mut cell = JsonValue::new_object();
        cell["mappings"] = mappings;
        cell["genes"] = genes;
        if let Some(xy) = self.xy {
            cell["xy"] = point_to_json(xy);
        }
        cell["factors"] = factors;
        cell["poly"] = points_to_json(&self.poly);
        cell
    }
}

pub fn point_to_json(xy: Point) -> JsonValue {
    JsonValue::from(vec![xy.0, xy.1])
}

pub fn points_to_json(points: &[Point]) -> JsonValue {
    JsonValue::from(points.iter().map(|&xy| point_to_json(xy)).collect::<Vec<_>>())
}

pub fn parse_point(value: &JsonValue) -> Option<Point> {
    if !value.is_array() || value.len() != 2 {
        return None;
    }
    Some((parse_number(&value[0])?, parse_number(&value[1])?))
}

pub fn parse_points(value: &JsonValue) -> Option<Vec<Point>> {
    if !value.is_array() {
        return None;
    }
    value.members().map(parse_point).collect()
}

// Some exporters write coordinates as strings ("12.5"), so accept both.
fn parse_number(value: &JsonValue) -> Option<f64> {
    value.as_f64().or_else(|| value.as_str()?.trim().parse::<f64>().ok())
}

// Factor values show up as strings, bare numbers, or single-element arrays
// of either, depending on which pipeline produced the file.
fn parse_factor_value(value: &JsonValue) -> Option<String> {
    if let Some(s) = value.as_str() {
        Some(s.to_string())
    } else if value.is_number() || value.is_boolean() {
        Some(value.dump())
    } else if value.is_array() && value.len() == 1 {
        parse_factor_value(&value[0])
    } else {
        None
    }
}

/// Cells keyed by id. Iteration follows insertion order, which is only
/// meaningful where first-occurrence order is explicitly part of an output.
#[derive(Clone, Debug, Default)]
pub struct CellTable {
    cells: Vec<Cell>,
    index: HashMap<String, usize>,
}

impl CellTable {
    pub fn new() -> Self {
        CellTable::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Cell> {
        self.index.get(id).map(|&i| &self.cells[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Cell> {
        self.index.get(id).map(|&i| &mut self.cells[i])
    }

    /// Insert a cell, replacing (in place) any existing cell with the same id.
    pub fn insert(&mut self, cell: Cell) -> Option<Cell> {
        if let Some(&i) = self.index.get(cell.id()) {
            Some(std::mem::replace(&mut self.cells[i], cell))
        } else {
            self.index.insert(cell.id().to_string(), self.cells.len());
            self.cells.push(cell);
            None
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|cell| cell.id())
    }

    // Ids are private to `Cell`, so handing out the slice can't corrupt the index.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Parse the `{id: {xy, poly, genes, factors, mappings}}` document shape.
    /// Every field is optional.
    pub fn from_json(data: &JsonValue, source_name: &str) -> Result<CellTable> {
        if !data.is_object() {
            return Err(Error::invalid_input(source_name, "expected an object keyed by cell id"));
        }

        let mut table = CellTable::new();
        for (id, value) in data.entries() {
            let mut cell = Cell::new(id);

            let xy = &value["xy"];
            if !xy.is_null() {
                cell.xy = Some(parse_point(xy).ok_or_else(|| {
                    Error::invalid_input(source_name, format!("cell '{id}' has a malformed 'xy'"))
                })?);
            }

            let poly = &value["poly"];
            if !poly.is_null() {
                cell.poly = parse_points(poly).ok_or_else(|| {
                    Error::invalid_input(source_name, format!("cell '{id}' has a malformed 'poly'"))
                })?;
            }

            for (gene, level) in value["genes"].entries() {
                let level = parse_number(level).ok_or_else(|| {
                    Error::invalid_input(
                        source_name,
                        format!("cell '{id}' has a non-numeric level for gene '{gene}'"),
                    )
                })?;
                cell.set_gene(gene, level);
            }

            for (factor, factor_value) in value["factors"].entries() {
                let factor_value = parse_factor_value(factor_value).ok_or_else(|| {
                    Error::invalid_input(
                        source_name,
                        format!("cell '{id}' has an unsupported value for factor '{factor}'"),
                    )
                })?;
                cell.set_factor(factor, factor_value);
            }

            for (name, xy) in value["mappings"].entries() {
                let xy = parse_point(xy).ok_or_else(|| {
                    Error::invalid_input(
                        source_name,
                        format!("cell '{id}' has a malformed mapping '{name}'"),
                    )
                })?;
                cell.set_mapping(name, xy);
            }

            table.insert(cell);
        }

        Ok(table)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut data = JsonValue::new_object();
        for cell in &self.cells {
            data[cell.id()] = cell.to_json();
        }
        data
    }
}

impl FromIterator<Cell> for CellTable {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        let mut table = CellTable::new();
        for cell in iter {
            table.insert(cell);
        }
        table
    }
}

impl<'a> IntoIterator for &'a CellTable {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
