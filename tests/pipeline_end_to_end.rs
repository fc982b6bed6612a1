//! Drives the whole pipeline from JSON files on disk to JSON files on disk.

use approx::assert_relative_eq;
use cellprep::cellsets::CellSetFactor;
use cellprep::input::{read_cells, read_json, read_segmentation};
use cellprep::molecules::{
    cells_from_molecules, molecules_by_gene, read_molecules_csv, MoleculeColumns,
};
use cellprep::output::{
    write_cell_sets, write_cells, write_clusters, write_factors, write_genes, write_molecules,
    write_neighborhoods, write_transform,
};
use cellprep::pipeline::{merge_cells, prepare, PipelineOptions};
use cellprep::schemas::OutputFormat;
use regex::Regex;
use std::fs;
use std::path::Path;

const CELLS: &str = r#"{
 "O": {"xy": [100, 100], "genes": {"a": 8, "b": 2, "c": 7, "EMPTY_1": 5}, "factors": {"cluster": ["Cluster 2"]}},
 "N": {"xy": [100, 110], "genes": {"a": 1, "b": 1, "c": 1}, "factors": {"cluster": ["Cluster 1"]}},
 "E": {"xy": [110, 100], "genes": {"a": 9, "b": 2, "c": 10}, "factors": {"cluster": ["Cluster 2"]}},
 "S": {"xy": [100, 90], "genes": {"a": 2, "b": 9}, "factors": {"cluster": ["Cluster 1"]}},
 "W": {"xy": [90, 100], "genes": {"c": 3}, "factors": {"cluster": ["Cluster 3"]},
       "mappings": {"UMAP": [1.5, -2.0]}}
}"#;

const SEGMENTATION: &str = r#"{
 "W": [[88, 98], [92, 98], [92, 102], [88, 102]],
 "unknown": [[0, 0], [1, 0], [0, 1]]
}"#;

fn path_str(dir: &Path, name: &str) -> Option<String> {
    Some(dir.join(name).to_str().unwrap().to_string())
}

#[test]
fn test_prepare_and_write_all_documents() {
    let dir = tempfile::tempdir().unwrap();
    let cells_path = dir.path().join("cells.in.json");
    let seg_path = dir.path().join("segmentation.json");
    fs::write(&cells_path, CELLS).unwrap();
    fs::write(&seg_path, SEGMENTATION).unwrap();

    let cells = read_cells(cells_path.to_str().unwrap()).unwrap();
    let segmentation = read_segmentation(seg_path.to_str().unwrap()).unwrap();

    let options = PipelineOptions {
        excluded_genes: Some(Regex::new("^EMPTY").unwrap()),
        cell_set_factors: vec!["cluster=Clusters".parse::<CellSetFactor>().unwrap()],
        neighborhoods: true,
        clusters: true,
        ..PipelineOptions::default()
    };
    let prepared = prepare(cells, Some(segmentation.as_slice()), &options).unwrap();

    // The segmented cell keeps its centroid (the square is centered on it), and
    // the extremes of each axis land on the domain edges.
    let transform = prepared.transform.unwrap();
    assert_relative_eq!(transform.x_shift, -100.0);
    assert_relative_eq!(transform.x_scale, 100.0);
    assert_eq!(prepared.cells.get("W").unwrap().xy, Some((-1000.0, 0.0)));
    assert_eq!(prepared.cells.get("E").unwrap().xy, Some((1000.0, 0.0)));
    assert_eq!(prepared.cells.get("W").unwrap().poly.len(), 8);
    assert_eq!(prepared.cells.get("W").unwrap().poly[0], (-1200.0, -200.0));
    assert!(prepared.cells.get("unknown").is_none());

    assert!(prepared.cells.get("O").unwrap().gene("EMPTY_1").is_none());
    assert!(prepared.genes.iter().all(|(gene, _)| gene != "EMPTY_1"));

    let neighborhoods = prepared.neighborhoods.as_ref().unwrap();
    let keys: Vec<&str> = neighborhoods.triangles.iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, vec!["O::E::N", "S::E::O", "W::O::N", "W::S::O"]);

    let clusters = prepared.clusters.as_ref().unwrap();
    assert_eq!(clusters.rows.len(), 3);
    assert_eq!(clusters.cols.len(), 5);

    let out = dir.path();
    let fmt = OutputFormat::Infer;
    write_cells(&path_str(out, "cells.json"), fmt, &prepared.cells).unwrap();
    write_transform(&path_str(out, "transform.json"), fmt, &transform).unwrap();
    write_factors(&path_str(out, "factors.json"), fmt, &prepared.factors).unwrap();
    write_genes(&path_str(out, "genes.json.gz"), fmt, &prepared.genes).unwrap();
    write_neighborhoods(&path_str(out, "neighborhoods.json"), fmt, neighborhoods).unwrap();
    write_clusters(&path_str(out, "clusters.json"), fmt, clusters).unwrap();
    write_cell_sets(
        &path_str(out, "cell_sets.json"),
        fmt,
        prepared.cell_sets.as_ref().unwrap(),
    )
    .unwrap();

    let cells = read_json(out.join("cells.json").to_str().unwrap()).unwrap();
    assert_eq!(cells["E"]["xy"][0].as_f64(), Some(1000.0));
    assert_eq!(cells["W"]["mappings"]["UMAP"][1].as_f64(), Some(-2.0));
    assert_eq!(cells["O"]["factors"]["cluster"].as_str(), Some("Cluster 2"));

    let transform = read_json(out.join("transform.json").to_str().unwrap()).unwrap();
    assert_eq!(transform["y_shift"].as_f64(), Some(-100.0));

    let factors = read_json(out.join("factors.json").to_str().unwrap()).unwrap();
    assert_eq!(factors["cluster"]["map"][0].as_str(), Some("Cluster 2"));
    assert_eq!(factors["cluster"]["map"][2].as_str(), Some("Cluster 3"));
    assert_eq!(factors["cluster"]["cells"]["S"].as_usize(), Some(1));

    let genes = read_json(out.join("genes.json.gz").to_str().unwrap()).unwrap();
    assert_eq!(genes["c"]["max"].as_f64(), Some(10.0));
    assert!(genes["EMPTY_1"].is_null());

    let neighborhoods = read_json(out.join("neighborhoods.json").to_str().unwrap()).unwrap();
    assert_eq!(neighborhoods["O::E::N"]["poly"][1][0].as_f64(), Some(1000.0));

    let clusters = read_json(out.join("clusters.json").to_str().unwrap()).unwrap();
    assert_eq!(clusters["rows"].len(), 3);
    assert_eq!(clusters["matrix"][0].len(), 5);

    let cell_sets = read_json(out.join("cell_sets.json").to_str().unwrap()).unwrap();
    assert_eq!(cell_sets["tree"][0]["name"].as_str(), Some("Clusters"));
    assert_eq!(cell_sets["tree"][0]["children"][0]["name"].as_str(), Some("Cluster 1"));
    assert_eq!(cell_sets["tree"][0]["children"][0]["set"].len(), 2);
}

#[test]
fn test_missing_factor_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let cells_path = dir.path().join("cells.json");
    fs::write(
        &cells_path,
        r#"{"a": {"xy": [0, 0], "factors": {"k": "1"}}, "b": {"xy": [1, 1]}}"#,
    )
    .unwrap();

    let cells = read_cells(cells_path.to_str().unwrap()).unwrap();
    let err = prepare(cells, None, &PipelineOptions::default()).unwrap_err();
    assert!(err.to_string().contains("'b'"));
}

#[test]
fn test_molecules_merged_into_cell_table() {
    let dir = tempfile::tempdir().unwrap();
    let cells_path = dir.path().join("cells.json");
    let molecules_path = dir.path().join("molecules.csv");
    fs::write(
        &cells_path,
        r#"{"a": {"xy": [0, 0], "factors": {"cluster": "1"}},
            "b": {"xy": [10, 10], "factors": {"cluster": "2"}}}"#,
    )
    .unwrap();
    fs::write(
        &molecules_path,
        "cell,gene,x,y\na,Gad2,0,0\na,Gad2,2,0\na,Vip,0,2\na,Gad2,2,2\nc,Vip,50,50\n,Vip,7,7\n",
    )
    .unwrap();

    let mut cells = read_cells(cells_path.to_str().unwrap()).unwrap();
    let molecules =
        read_molecules_csv(molecules_path.to_str().unwrap(), &MoleculeColumns::default())
            .unwrap();
    let skipped = merge_cells(&mut cells, &cells_from_molecules(&molecules).unwrap());
    assert_eq!(skipped, 1);

    let options = PipelineOptions {
        cell_set_factors: vec![CellSetFactor::new("cluster")],
        ..PipelineOptions::default()
    };
    let prepared = prepare(cells, None, &options).unwrap();

    assert_eq!(prepared.cells.len(), 2);
    assert!(prepared.cells.get("c").is_none());
    let a = prepared.cells.get("a").unwrap();
    assert_eq!(a.xy, Some((-1000.0, -1000.0)));
    assert_eq!(a.gene("Gad2"), Some(3.0));
    assert_eq!(a.factor("cluster"), Some("1"));
    assert_eq!(prepared.factors[0].1.map, vec!["1", "2"]);
    assert_eq!(prepared.cell_sets.unwrap().tree[0].children.len(), 2);

    let out = path_str(dir.path(), "molecules.json");
    write_molecules(&out, OutputFormat::Infer, &molecules_by_gene(&molecules)).unwrap();
    let written = read_json(dir.path().join("molecules.json").to_str().unwrap()).unwrap();
    assert_eq!(written["Vip"].len(), 3);
    assert_eq!(written["Gad2"].len(), 3);
}
