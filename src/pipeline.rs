// Fixed-order enrichment of a cell table: segmentation is simplified to
// octagons (which also fixes each centroid), then every centroid and polygon
// vertex is moved into the display domain. The encodings, neighborhoods and
// clustering all read the enriched table.

use rayon::prelude::*;
use regex::Regex;

use crate::cells::{CellTable, Point};
use crate::cellsets::{cell_sets, CellSetFactor, CellSets};
use crate::cluster::{cluster, normalize_to_max, ClusteredMatrix};
use crate::encode::{encode_factors, encode_genes, FactorEncoding, GeneEncoding};
use crate::error::Result;
use crate::geometry::{mean_coord, octagon, octagon_points};
use crate::neighborhoods::{build_neighborhoods, Neighborhoods};
use crate::transform::{
    apply_transform, check_precision, compute_transform, Transform, TransformConfig,
};

/// Replace the boundary of every segmented cell with its octagon, and its
/// centroid with the octagon's mean. Polygons for cells not in the table are
/// ignored. Returns the number of cells updated.
pub fn simplify_segmentation(
    table: &mut CellTable,
    segmentation: &[(String, Vec<Point>)],
) -> Result<usize> {
    let simplified = segmentation
        .par_iter()
        .filter(|(id, _)| table.contains(id))
        .map(|(id, poly)| -> Result<(String, Vec<Point>, Point)> {
            let poly = octagon_points(&octagon(poly.as_slice())?);
            let xy = mean_coord(poly.as_slice())?;
            Ok((id.clone(), poly, xy))
        })
        .collect::<Result<Vec<_>>>()?;

    let skipped = segmentation.len() - simplified.len();
    if skipped > 0 {
        log::warn!("Ignoring {} polygons of unknown cells", skipped);
    }

    let n = simplified.len();
    for (id, poly, xy) in simplified {
        if let Some(cell) = table.get_mut(&id) {
            cell.poly = poly;
            cell.xy = Some(xy);
        }
    }

    Ok(n)
}

/// Compute one transform from every centroid in the table and apply it to
/// all centroids and polygon vertices.
pub fn normalize_coordinates(table: &mut CellTable, config: &TransformConfig) -> Result<Transform> {
    config.validate()?;
    let centroids: Vec<Point> = table.iter().filter_map(|cell| cell.xy).collect();
    let transform = compute_transform(&centroids, config)?;

    table.cells_mut().par_iter_mut().for_each(|cell| {
        if let Some(xy) = cell.xy {
            cell.xy = Some(apply_transform(&transform, xy, config.precision));
        }
        for xy in cell.poly.iter_mut() {
            *xy = apply_transform(&transform, *xy, config.precision);
        }
    });

    log::debug!("Applied transform {:?} to {} cells", transform, table.len());
    Ok(transform)
}

/// Drop every gene whose id matches `excluded`. Returns how many gene levels
/// were removed.
pub fn exclude_genes(table: &mut CellTable, excluded: &Regex) -> usize {
    table
        .cells_mut()
        .iter_mut()
        .map(|cell| {
            let before = cell.genes.len();
            cell.genes.retain(|(gene, _)| !excluded.is_match(gene));
            before - cell.genes.len()
        })
        .sum()
}

/// Take position, boundary and gene levels from cells built out of molecule
/// data. Only cells already in the table are updated, so every cell keeps the
/// factors it was read with. Returns the number of molecule cells skipped.
pub fn merge_cells(table: &mut CellTable, other: &CellTable) -> usize {
    let mut skipped = 0;
    for incoming in other.iter() {
        let Some(cell) = table.get_mut(incoming.id()) else {
            skipped += 1;
            continue;
        };
        if incoming.xy.is_some() {
            cell.xy = incoming.xy;
        }
        if !incoming.poly.is_empty() {
            cell.poly = incoming.poly.clone();
        }
        for (gene, level) in &incoming.genes {
            cell.set_gene(gene, *level);
        }
    }

    if skipped > 0 {
        log::warn!("Ignoring molecules of {} cells missing from the cell table", skipped);
    }
    skipped
}

#[derive(Clone, Debug, Default)]
pub struct PipelineOptions {
    pub transform: TransformConfig,
    pub excluded_genes: Option<Regex>,
    pub cell_set_factors: Vec<CellSetFactor>,
    pub neighborhoods: bool,
    pub clusters: bool,
    /// Rescale the clustered matrix to its maximum, rounding to this many digits.
    pub normalize_matrix: Option<u32>,
}

/// Everything derived from one cell table.
#[derive(Clone, Debug)]
pub struct Prepared {
    pub cells: CellTable,
    pub transform: Option<Transform>,
    pub factors: Vec<(String, FactorEncoding)>,
    pub genes: Vec<(String, GeneEncoding)>,
    pub neighborhoods: Option<Neighborhoods>,
    pub clusters: Option<ClusteredMatrix>,
    pub cell_sets: Option<CellSets>,
}

pub fn prepare(
    mut cells: CellTable,
    segmentation: Option<&[(String, Vec<Point>)]>,
    options: &PipelineOptions,
) -> Result<Prepared> {
    if let Some(digits) = options.normalize_matrix {
        check_precision(digits)?;
    }

    if let Some(segmentation) = segmentation {
        let n = simplify_segmentation(&mut cells, segmentation)?;
        log::info!("Simplified {} cell boundaries", n);
    }

    let transform = if cells.iter().any(|cell| cell.xy.is_some()) {
        Some(normalize_coordinates(&mut cells, &options.transform)?)
    } else {
        log::warn!("No cell has a position; coordinates left untransformed");
        None
    };

    if let Some(excluded) = &options.excluded_genes {
        let removed = exclude_genes(&mut cells, excluded);
        log::info!("Excluded {} gene levels matching '{}'", removed, excluded);
    }

    let factors = encode_factors(&cells)?;
    let genes = encode_genes(&cells);

    let neighborhoods = if options.neighborhoods {
        Some(build_neighborhoods(&cells)?)
    } else {
        None
    };

    let clusters = if options.clusters {
        let mut clusters = cluster(&cells)?;
        if let Some(digits) = options.normalize_matrix {
            normalize_to_max(&mut clusters.matrix, digits);
        }
        Some(clusters)
    } else {
        None
    };

    let cell_sets = if options.cell_set_factors.is_empty() {
        None
    } else {
        Some(cell_sets(&cells, &options.cell_set_factors)?)
    };

    log::info!(
        "Prepared {} cells with {} factors and {} genes",
        cells.len(),
        factors.len(),
        genes.len()
    );

    Ok(Prepared {
        cells,
        transform,
        factors,
        genes,
        neighborhoods,
        clusters,
        cell_sets,
    })
}
