//! Property-based tests for encodings, neighborhoods and matrix clustering.

use cellprep::cells::{Cell, CellTable};
use cellprep::cluster::{cluster, normalize_to_max};
use cellprep::encode::{encode_factor, encode_genes};
use cellprep::neighborhoods::build_neighborhoods;
use proptest::prelude::*;
use std::collections::HashSet;

fn factor_table(values: &[u8]) -> CellTable {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let mut cell = Cell::new(format!("cell-{i}"));
            cell.set_factor("cluster", format!("Cluster {v}"));
            cell
        })
        .collect()
}

fn expression_table(levels: &[Vec<u8>]) -> CellTable {
    levels
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cell = Cell::new(format!("cell-{i}"));
            for (j, &level) in row.iter().enumerate() {
                // leave some genes unreported so missing entries are exercised
                if level % 5 != 0 {
                    cell.set_gene(&format!("gene-{j}"), level as f64);
                }
            }
            cell
        })
        .collect()
}

fn expression_levels() -> impl Strategy<Value = Vec<Vec<u8>>> {
    (1_usize..8, 1_usize..6).prop_flat_map(|(ncells, ngenes)| {
        prop::collection::vec(prop::collection::vec(0_u8..20, ngenes), ncells)
    })
}

proptest! {
    /// `map` holds each distinct value exactly once and every cell points at its own value.
    #[test]
    fn prop_factor_encoding_is_bijective(values in prop::collection::vec(0_u8..6, 1..40)) {
        let table = factor_table(&values);
        let encoding = encode_factor(&table, "cluster").unwrap();

        let distinct: HashSet<u8> = values.iter().cloned().collect();
        prop_assert_eq!(encoding.map.len(), distinct.len());
        prop_assert_eq!(
            encoding.map.iter().collect::<HashSet<_>>().len(),
            encoding.map.len()
        );
        prop_assert_eq!(encoding.cells.len(), values.len());

        for (i, v) in values.iter().enumerate() {
            let id = format!("cell-{i}");
            let expected = format!("Cluster {v}");
            prop_assert_eq!(encoding.value(&id), Some(expected.as_str()));
        }

        // first occurrence order
        prop_assert_eq!(&encoding.map[0], &format!("Cluster {}", values[0]));
    }

    #[test]
    fn prop_gene_max_is_largest_level(levels in expression_levels()) {
        let table = expression_table(&levels);
        for (_, encoding) in encode_genes(&table) {
            let max = encoding.cells.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(encoding.max, max);
        }
    }

    /// Clustering only permutes rows and columns.
    #[test]
    fn prop_cluster_preserves_values(levels in expression_levels()) {
        let table = expression_table(&levels);
        let clustered = cluster(&table).unwrap();

        let mut cols = clustered.cols.clone();
        cols.sort();
        let mut ids: Vec<String> = table.ids().map(|id| id.to_string()).collect();
        ids.sort();
        prop_assert_eq!(cols, ids);

        for (i, gene) in clustered.rows.iter().enumerate() {
            for (j, id) in clustered.cols.iter().enumerate() {
                let level = table.get(id).unwrap().gene(gene).unwrap_or(0.0);
                prop_assert_eq!(clustered.matrix[[i, j]], level);
            }
        }
    }

    #[test]
    fn prop_normalized_matrix_is_within_unit_interval(levels in expression_levels()) {
        let mut clustered = cluster(&expression_table(&levels)).unwrap();
        normalize_to_max(&mut clustered.matrix, 3);
        prop_assert!(clustered.matrix.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    /// Triangle keys don't depend on the order cells were added in.
    #[test]
    fn prop_neighborhoods_independent_of_order(
        points in prop::collection::vec((-1000.0_f64..1000.0, -1000.0_f64..1000.0), 3..30),
        seed in any::<u64>()
    ) {
        let distinct: HashSet<(u64, u64)> =
            points.iter().map(|p| (p.0.to_bits(), p.1.to_bits())).collect();
        prop_assume!(distinct.len() == points.len());

        let cells: Vec<Cell> = points
            .iter()
            .enumerate()
            .map(|(i, &xy)| {
                let mut cell = Cell::new(format!("c{i}"));
                cell.xy = Some(xy);
                cell
            })
            .collect();

        let mut shuffled = cells.clone();
        let n = shuffled.len();
        // deterministic Fisher-Yates driven by the seed
        let mut state = seed | 1;
        for i in (1..n).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            shuffled.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let forward = build_neighborhoods(&cells.into_iter().collect());
        let reordered = build_neighborhoods(&shuffled.into_iter().collect());
        match (forward, reordered) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "results disagree: {:?} vs {:?}", a, b),
        }
    }
}
