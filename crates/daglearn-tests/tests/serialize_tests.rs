//! Output artifact tests: edge-list round trips through real files and
//! summary JSON shape.

use daglearn_core::engine::dataset::{DiscreteDataset, Variable};
use daglearn_core::engine::serialize::{
    read_edge_list_path, write_edge_list_path,
};
use daglearn_core::{learn_structure, DagState, RunSummary, SearchConfig, Strategy, VarId};

fn dataset() -> DiscreteDataset {
    let vars = vec![
        Variable::with_cardinality("age", 3),
        Variable::with_cardinality("income", 3),
        Variable::with_cardinality("owns_car", 2),
    ];
    let rows = vec![
        vec![0, 0, 0],
        vec![1, 1, 1],
        vec![2, 2, 1],
        vec![0, 1, 0],
        vec![2, 1, 1],
        vec![1, 0, 0],
    ];
    DiscreteDataset::from_parts(vars, &rows).expect("dataset")
}

#[test]
fn edge_list_file_round_trip_preserves_parent_sets() {
    let ds = dataset();
    let mut dag = DagState::new(3, 2);
    dag.add_edge(VarId(0), VarId(1)).expect("edge");
    dag.add_edge(VarId(0), VarId(2)).expect("edge");
    dag.add_edge(VarId(1), VarId(2)).expect("edge");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("structure.gph");
    write_edge_list_path(&path, &ds, &dag).expect("write");

    let restored = read_edge_list_path(&path, &ds, 2).expect("read");
    for v in ds.var_ids() {
        assert_eq!(restored.parents(v), dag.parents(v), "parents of {:?}", v);
    }
    assert_eq!(restored.edge_count(), dag.edge_count());
}

#[test]
fn edge_list_write_to_unwritable_destination_is_an_io_error() {
    let ds = dataset();
    let dag = DagState::new(3, 2);
    let err = write_edge_list_path("/nonexistent-dir/out.gph", &ds, &dag)
        .expect_err("must fail");
    assert!(matches!(err, daglearn_core::LearnError::Io(_)));
}

#[test]
fn summary_json_carries_score_parents_and_config() {
    let ds = dataset();
    let config = SearchConfig {
        max_parents: 2,
        max_iterations: 100,
        hill_restarts: 1,
        seed: 3,
        strategies: vec![Strategy::Hill],
        ..SearchConfig::scaled_for(ds.num_vars(), ds.num_rows())
    };
    let outcome = learn_structure(&ds, config.clone()).expect("learn");
    let summary = RunSummary::new(&ds, &config, &outcome).expect("summary");

    let json: serde_json::Value =
        serde_json::from_str(&summary.to_json_string().expect("render")).expect("parse");

    assert_eq!(json["dataset"]["num_vars"], 3);
    assert_eq!(json["dataset"]["num_rows"], 6);
    assert_eq!(json["config"]["max_parents"], 2);
    assert_eq!(json["config"]["seed"], 3);
    assert_eq!(json["results"]["strategy"], "hill");
    assert!(json["results"]["score"].is_f64());
    assert!(json["results"]["parents"].get("owns_car").is_some());
    assert!(json["timing"]["elapsed_secs"].is_f64());
    assert!(json["cache"]["misses"].as_u64().unwrap() > 0);
}

#[test]
fn summary_writes_to_disk() {
    let ds = dataset();
    let config = SearchConfig {
        max_iterations: 50,
        strategies: vec![Strategy::Hill],
        ..SearchConfig::scaled_for(ds.num_vars(), ds.num_rows())
    };
    let outcome = learn_structure(&ds, config.clone()).expect("learn");
    let summary = RunSummary::new(&ds, &config, &outcome).expect("summary");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("run_summary.json");
    summary.write_json_path(&path).expect("write");

    let text = std::fs::read_to_string(&path).expect("read back");
    let parsed: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert!(parsed["results"]["num_edges"].is_u64());
}
