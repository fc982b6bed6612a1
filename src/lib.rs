//! Prepares per-cell spatial metadata for display: simplified boundaries,
//! coordinates in a fixed display domain, Delaunay neighborhoods, compact
//! factor and gene encodings, and a clustered expression heatmap.

pub mod cells;
pub mod cellsets;
pub mod cluster;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod input;
pub mod molecules;
pub mod neighborhoods;
pub mod output;
pub mod pipeline;
pub mod schemas;
pub mod transform;

pub use cells::{Cell, CellTable, Point};
pub use cluster::{cluster, normalize_to_max, ClusteredMatrix};
pub use encode::{encode_factor, encode_genes, FactorEncoding, GeneEncoding};
pub use error::{Error, Result};
pub use geometry::{mean_coord, octagon, Octagon};
pub use neighborhoods::{build_neighborhoods, triangulate, Neighborhoods, Triangle};
pub use transform::{apply_transform, compute_transform, ScalingPolicy, Transform, TransformConfig};
