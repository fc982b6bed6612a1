use clap::Parser;
use rayon::current_num_threads;
use regex::Regex;
use std::process::ExitCode;

use cellprep::cells::CellTable;
use cellprep::cellsets::CellSetFactor;
use cellprep::error::Result;
use cellprep::input::{read_cells, read_segmentation};
use cellprep::molecules::{
    cells_from_molecules, molecules_by_gene, read_molecules_csv, MoleculeColumns,
};
use cellprep::output::{
    write_cell_sets, write_cells, write_clusters, write_factors, write_genes, write_molecules,
    write_neighborhoods, write_transform,
};
use cellprep::pipeline::{merge_cells, prepare, PipelineOptions};
use cellprep::schemas::OutputFormat;
use cellprep::transform::{
    ScalingPolicy, TransformConfig, DEFAULT_DOMAIN, DEFAULT_PRECISION,
    MAX_PRECISION,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Cell table as JSON, `{cell id: {xy, poly, genes, factors, mappings}}`
    cells_json: Option<String>,

    /// Segmentation polygons as JSON, `{cell id: [[x, y], ...]}`
    #[arg(long, default_value = None)]
    segmentation: Option<String>,

    /// Build cells from a per-molecule CSV table
    #[arg(long, default_value = None)]
    molecules_csv: Option<String>,

    #[arg(long, default_value = "cell")]
    cell_column: String,

    #[arg(long, default_value = "gene")]
    gene_column: String,

    #[arg(short, long, default_value = "x")]
    x_column: String,

    #[arg(short, long, default_value = "y")]
    y_column: String,

    /// Use the column names of MERFISH molecule exports
    #[arg(long, default_value_t = false)]
    merfish: bool,

    /// Width and height of the display domain
    #[arg(long, default_value_t = DEFAULT_DOMAIN)]
    domain: f64,

    #[arg(long, value_enum, default_value_t = ScalingPolicy::Independent)]
    scaling: ScalingPolicy,

    /// Decimal digits kept in transformed coordinates
    #[arg(long, default_value_t = DEFAULT_PRECISION,
          value_parser = clap::value_parser!(u32).range(0..=MAX_PRECISION as i64))]
    precision: u32,

    /// Regex of gene ids to leave out of encodings and clustering
    #[arg(long, default_value = None)]
    excluded_genes: Option<String>,

    /// Rescale the clustered matrix to its maximum, rounded to this many digits
    #[arg(long, default_value = None,
          value_parser = clap::value_parser!(u32).range(0..=MAX_PRECISION as i64))]
    normalize_matrix: Option<u32>,

    /// Factor to build cell sets from, as `factor` or `factor=Display Name`
    #[arg(long = "cell-set-factor")]
    cell_set_factors: Vec<CellSetFactor>,

    #[arg(short = 't', long, default_value = None)]
    nthreads: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Infer)]
    output_fmt: OutputFormat,

    #[arg(long, default_value = None)]
    output_cells: Option<String>,

    #[arg(long, default_value = None)]
    output_transform: Option<String>,

    #[arg(long, default_value = None)]
    output_factors: Option<String>,

    #[arg(long, default_value = None)]
    output_genes: Option<String>,

    #[arg(long, default_value = None)]
    output_neighborhoods: Option<String>,

    #[arg(long, default_value = None)]
    output_clusters: Option<String>,

    #[arg(long, default_value = None)]
    output_cell_sets: Option<String>,

    #[arg(long, default_value = None)]
    output_molecules: Option<String>,
}

fn set_merfish_presets(args: &mut Args) {
    args.gene_column = String::from("gene1");
}

fn run(args: Args) -> Result<()> {
    let excluded_genes = match &args.excluded_genes {
        Some(pattern) => Some(Regex::new(pattern).map_err(|err| {
            cellprep::Error::invalid_input("--excluded-genes", err.to_string())
        })?),
        None => None,
    };

    let mut cells = match &args.cells_json {
        Some(path) => read_cells(path)?,
        None => CellTable::new(),
    };

    if let Some(path) = &args.molecules_csv {
        let columns = MoleculeColumns {
            cell: args.cell_column.clone(),
            gene: args.gene_column.clone(),
            x: args.x_column.clone(),
            y: args.y_column.clone(),
        };
        let molecules = read_molecules_csv(path, &columns)?;
        let molecule_cells = cells_from_molecules(&molecules)?;
        if args.cells_json.is_some() {
            merge_cells(&mut cells, &molecule_cells);
        } else {
            cells = molecule_cells;
        }
        write_molecules(
            &args.output_molecules,
            args.output_fmt,
            &molecules_by_gene(&molecules),
        )?;
    } else if args.output_molecules.is_some() {
        log::warn!("--output-molecules needs --molecules-csv; not writing molecules");
    }

    let segmentation = match &args.segmentation {
        Some(path) => Some(read_segmentation(path)?),
        None => None,
    };

    let options = PipelineOptions {
        transform: TransformConfig {
            domain: args.domain,
            policy: args.scaling,
            precision: args.precision,
        },
        excluded_genes,
        cell_set_factors: args.cell_set_factors.clone(),
        neighborhoods: args.output_neighborhoods.is_some(),
        clusters: args.output_clusters.is_some(),
        normalize_matrix: args.normalize_matrix,
    };

    let prepared = prepare(cells, segmentation.as_deref(), &options)?;

    write_cells(&args.output_cells, args.output_fmt, &prepared.cells)?;
    if let Some(transform) = &prepared.transform {
        write_transform(&args.output_transform, args.output_fmt, transform)?;
    }
    write_factors(&args.output_factors, args.output_fmt, &prepared.factors)?;
    write_genes(&args.output_genes, args.output_fmt, &prepared.genes)?;
    if let Some(neighborhoods) = &prepared.neighborhoods {
        write_neighborhoods(&args.output_neighborhoods, args.output_fmt, neighborhoods)?;
    }
    if let Some(clusters) = &prepared.clusters {
        write_clusters(&args.output_clusters, args.output_fmt, clusters)?;
    }
    if let Some(cell_sets) = &prepared.cell_sets {
        write_cell_sets(&args.output_cell_sets, args.output_fmt, cell_sets)?;
    } else if args.output_cell_sets.is_some() {
        log::warn!("--output-cell-sets needs at least one --cell-set-factor");
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = Args::parse();

    if let Some(nthreads) = args.nthreads {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(nthreads)
            .build_global()
        {
            log::error!("Unable to set up thread pool: {}", err);
            return ExitCode::FAILURE;
        }
    }
    log::info!("Using {} threads", current_num_threads());

    if args.cells_json.is_none() && args.molecules_csv.is_none() {
        log::error!("Either a cells JSON file or --molecules-csv is required");
        return ExitCode::FAILURE;
    }

    if args.merfish {
        set_merfish_presets(&mut args);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
