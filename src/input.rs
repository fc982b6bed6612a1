use flate2::read::GzDecoder;
use json::JsonValue;
use std::fs::File;
use std::io::Read;

use crate::cells::{parse_points, CellTable, Point};
use crate::error::{Error, Result};

/// Read and parse a JSON document, gzip-compressed if the name ends in `.gz`.
pub fn read_json(path: &str) -> Result<JsonValue> {
    let file = File::open(path)?;
    let mut text = String::new();
    if path.ends_with(".gz") {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut text)?;
    }
    Ok(json::parse(&text)?)
}

pub fn read_cells(path: &str) -> Result<CellTable> {
    let table = CellTable::from_json(&read_json(path)?, path)?;
    log::info!("Read {} cells from {}", table.len(), path);
    Ok(table)
}

/// Parse a `{cell id: [[x, y], ...]}` segmentation document.
pub fn parse_segmentation(data: &JsonValue, source_name: &str) -> Result<Vec<(String, Vec<Point>)>> {
    if !data.is_object() {
        return Err(Error::invalid_input(
            source_name,
            "expected an object mapping cell ids to polygons",
        ));
    }

    data.entries()
        .map(|(id, poly)| -> Result<(String, Vec<Point>)> {
            let poly = parse_points(poly).ok_or_else(|| {
                Error::invalid_input(source_name, format!("cell '{id}' has a malformed polygon"))
            })?;
            Ok((id.to_string(), poly))
        })
        .collect()
}

pub fn read_segmentation(path: &str) -> Result<Vec<(String, Vec<Point>)>> {
    let segmentation = parse_segmentation(&read_json(path)?, path)?;
    log::info!("Read {} polygons from {}", segmentation.len(), path);
    Ok(segmentation)
}
