use flate2::write::GzEncoder;
use flate2::Compression;
use json::JsonValue;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::cells::{CellTable, Point};
use crate::cellsets::CellSets;
use crate::cluster::ClusteredMatrix;
use crate::encode::{factors_to_json, genes_to_json, FactorEncoding, GeneEncoding};
use crate::error::{Error, Result};
use crate::molecules::molecules_to_json;
use crate::neighborhoods::Neighborhoods;
use crate::schemas::OutputFormat;
use crate::transform::Transform;

const JSON_INDENT: u16 = 1;

pub fn determine_format(filename: &str, fmt: OutputFormat) -> Result<OutputFormat> {
    match fmt {
        OutputFormat::Infer => {
            if filename.ends_with(".json.gz") {
                Ok(OutputFormat::JsonGz)
            } else if filename.ends_with(".json") {
                Ok(OutputFormat::Json)
            } else {
                Err(Error::UnknownFormat(filename.to_string()))
            }
        }
        fmt => Ok(fmt),
    }
}

fn write_json_to<W: Write>(output: &mut W, data: &JsonValue) -> Result<()> {
    data.write_pretty(output, JSON_INDENT)?;
    output.write_all(b"\n")?;
    Ok(())
}

pub fn write_json(filename: &str, fmt: OutputFormat, data: &JsonValue) -> Result<()> {
    let fmt = determine_format(filename, fmt)?;
    let file = File::create(filename)?;

    match fmt {
        OutputFormat::JsonGz => {
            let mut encoder = GzEncoder::new(file, Compression::default());
            write_json_to(&mut encoder, data)?;
            encoder.finish()?;
        }
        _ => {
            let mut writer = BufWriter::new(file);
            write_json_to(&mut writer, data)?;
            writer.flush()?;
        }
    }

    log::info!("Wrote {}", filename);
    Ok(())
}

pub fn write_cells(output: &Option<String>, fmt: OutputFormat, cells: &CellTable) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &cells.to_json())?;
    }
    Ok(())
}

pub fn write_transform(
    output: &Option<String>,
    fmt: OutputFormat,
    transform: &Transform,
) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &transform.to_json())?;
    }
    Ok(())
}

pub fn write_factors(
    output: &Option<String>,
    fmt: OutputFormat,
    factors: &[(String, FactorEncoding)],
) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &factors_to_json(factors))?;
    }
    Ok(())
}

pub fn write_genes(
    output: &Option<String>,
    fmt: OutputFormat,
    genes: &[(String, GeneEncoding)],
) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &genes_to_json(genes))?;
    }
    Ok(())
}

pub fn write_neighborhoods(
    output: &Option<String>,
    fmt: OutputFormat,
    neighborhoods: &Neighborhoods,
) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &neighborhoods.to_json())?;
    }
    Ok(())
}

pub fn write_clusters(
    output: &Option<String>,
    fmt: OutputFormat,
    clusters: &ClusteredMatrix,
) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &clusters.to_json())?;
    }
    Ok(())
}

pub fn write_cell_sets(
    output: &Option<String>,
    fmt: OutputFormat,
    cell_sets: &CellSets,
) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &cell_sets.to_json())?;
    }
    Ok(())
}

pub fn write_molecules(
    output: &Option<String>,
    fmt: OutputFormat,
    by_gene: &[(String, Vec<Point>)],
) -> Result<()> {
    if let Some(output) = output {
        write_json(output, fmt, &molecules_to_json(by_gene))?;
    }
    Ok(())
}
