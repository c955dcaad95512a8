//! Dataset loading behavior: schema failures happen at construction,
//! strictly before any search could run.

use std::io::Cursor;

use daglearn_core::engine::dataset::{Domain, Variable};
use daglearn_core::{DiscreteDataset, LearnError};

#[test]
fn out_of_domain_value_fails_before_any_search() {
    let vars = vec![
        Variable::with_cardinality("A", 2),
        Variable::with_cardinality("B", 3),
    ];
    // B declares cardinality 3; a value index of 3 is outside its domain.
    let rows = vec![vec![0, 0], vec![1, 3]];
    let err = DiscreteDataset::from_parts(vars, &rows).expect_err("must reject");
    assert!(matches!(err, LearnError::Schema(_)), "got {:?}", err);
    // No dataset exists, so no learner and no search iteration can follow.
}

#[test]
fn csv_with_one_based_integers_loads_with_shifted_domains() {
    let csv = "parent1,parent2,child\n1,2,1\n2,1,2\n1,1,1\n2,2,2\n";
    let ds = DiscreteDataset::from_csv_reader(Cursor::new(csv)).expect("load");
    assert_eq!(ds.num_vars(), 3);
    assert_eq!(ds.num_rows(), 4);
    assert_eq!(ds.cardinalities(), vec![2, 2, 2]);
    let p1 = ds.var_by_name("parent1").expect("column");
    assert_eq!(
        ds.variable(p1).expect("variable").domain,
        Domain::Numeric { lo: 1, hi: 2 }
    );
}

#[test]
fn csv_mixed_label_and_numeric_columns() {
    let csv = "weather,go_out\nsunny,1\nrain,0\nsunny,1\ncloudy,0\n";
    let ds = DiscreteDataset::from_csv_reader(Cursor::new(csv)).expect("load");
    let weather = ds.var_by_name("weather").expect("column");
    assert_eq!(
        ds.variable(weather).expect("variable").domain,
        Domain::Labeled {
            labels: vec!["cloudy".into(), "rain".into(), "sunny".into()]
        }
    );
    assert_eq!(ds.cardinality(weather).expect("cardinality"), 3);
}

#[test]
fn csv_duplicate_header_is_rejected() {
    let csv = "a,a\n0,1\n1,0\n";
    let err = DiscreteDataset::from_csv_reader(Cursor::new(csv)).expect_err("must reject");
    assert!(matches!(err, LearnError::Schema(_)));
}

#[test]
fn csv_ragged_row_is_rejected_with_line_number() {
    let csv = "a,b\n0,1\n1\n";
    let err = DiscreteDataset::from_csv_reader(Cursor::new(csv)).expect_err("must reject");
    let msg = err.to_string();
    assert!(msg.contains("line 3"), "unexpected message: {}", msg);
}

#[test]
fn csv_without_data_rows_is_rejected() {
    let csv = "a,b\n";
    let err = DiscreteDataset::from_csv_reader(Cursor::new(csv)).expect_err("must reject");
    assert!(matches!(err, LearnError::Schema(_)));
}

#[test]
fn constant_column_is_rejected() {
    // A column that never varies has cardinality 1.
    let csv = "a,b\n0,1\n0,0\n";
    let err = DiscreteDataset::from_csv_reader(Cursor::new(csv)).expect_err("must reject");
    assert!(err.to_string().contains("cardinality"));
}
