use json::JsonValue;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::cells::CellTable;
use crate::error::{Error, Result};

pub const CELL_SETS_VERSION: &str = "0.1.2";

/// Factor to build a top-level cell-set node from, and the name it is shown under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellSetFactor {
    pub factor: String,
    pub name: String,
}

impl CellSetFactor {
    pub fn new(factor: &str) -> Self {
        CellSetFactor {
            factor: factor.to_string(),
            name: factor.to_string(),
        }
    }
}

// "factor" or "factor=Display Name"
impl FromStr for CellSetFactor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (factor, name) = match s.split_once('=') {
            Some((factor, name)) => (factor.trim(), name.trim()),
            None => (s.trim(), s.trim()),
        };
        if factor.is_empty() {
            return Err(format!("no factor name in '{s}'"));
        }
        Ok(CellSetFactor {
            factor: factor.to_string(),
            name: if name.is_empty() { factor } else { name }.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CellSet {
    pub name: String,
    pub set: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CellSetNode {
    pub name: String,
    pub children: Vec<CellSet>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellSets {
    pub tree: Vec<CellSetNode>,
}

impl CellSets {
    pub fn to_json(&self) -> JsonValue {
        let tree = self
            .tree
            .iter()
            .map(|node| {
                let children = node
                    .children
                    .iter()
                    .map(|child| {
                        let mut leaf = JsonValue::new_object();
                        leaf["name"] = child.name.as_str().into();
                        leaf["set"] = JsonValue::from(child.set.clone());
                        leaf
                    })
                    .collect();

                let mut entry = JsonValue::new_object();
                entry["name"] = node.name.as_str().into();
                entry["children"] = JsonValue::Array(children);
                entry
            })
            .collect();

        let mut out = JsonValue::new_object();
        out["version"] = CELL_SETS_VERSION.into();
        out["datatype"] = "cell".into();
        out["tree"] = JsonValue::Array(tree);
        out
    }
}

/// Group cells by the value of each requested factor. Every cell must carry
/// every requested factor.
pub fn cell_sets(table: &CellTable, factors: &[CellSetFactor]) -> Result<CellSets> {
    let tree = factors
        .iter()
        .map(|factor| -> Result<CellSetNode> {
            let mut clusters: BTreeMap<&str, Vec<String>> = BTreeMap::new();
            for cell in table {
                let value = cell
                    .factor(&factor.factor)
                    .ok_or_else(|| Error::missing(cell.id(), &factor.factor))?;
                clusters
                    .entry(value)
                    .or_default()
                    .push(cell.id().to_string());
            }

            Ok(CellSetNode {
                name: factor.name.clone(),
                children: clusters
                    .into_iter()
                    .map(|(name, set)| CellSet {
                        name: name.to_string(),
                        set,
                    })
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CellSets { tree })
}
