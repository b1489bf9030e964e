// ABOUTME: End-to-end checks of the built-in library on the classic two-leaf test tree.
// ABOUTME: int_leaf holds 0..9 twenty times each, double_leaf a tenth of that.

use lookat_core::{Binning, DrawRequest, Evaluator, Library, Plottable};
use lookat_data::{BranchData, DataFile, DataLibrary, TreeData};

fn simple_tree() -> TreeData {
    let mut int_leaf = Vec::new();
    let mut double_leaf = Vec::new();
    for i in 0..10 {
        for _ in 0..20 {
            int_leaf.push(i as f64);
            double_leaf.push(0.1 * i as f64);
        }
    }
    TreeData {
        name: "simple_tree".to_string(),
        title: "simple tree for testing purposes".to_string(),
        branches: vec![
            BranchData {
                name: "int_leaf".to_string(),
                values: int_leaf,
            },
            BranchData {
                name: "double_leaf".to_string(),
                values: double_leaf,
            },
        ],
    }
}

fn draw<'a>(expression: &'a str, name: &'a str, binning: Binning) -> DrawRequest<'a> {
    DrawRequest {
        expression,
        selection: None,
        name,
        binning,
    }
}

#[test]
fn ratio_of_scaled_leaf_over_int_leaf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_input.json.zst");
    DataFile {
        trees: vec![simple_tree()],
    }
    .save(&path)
    .unwrap();

    let mut lib = DataLibrary::new();
    let file = lib.open(&path).unwrap();
    let tree = lib.tree(&file, "simple_tree").unwrap();

    let ints = lib
        .evaluate(&tree, &draw("int_leaf", "myHist_0", Binning::auto(40)))
        .unwrap();
    assert_eq!(ints.n_bins(), 10);
    assert!(ints.bin_content().iter().all(|&c| c == 20.0));

    // Second histogram on the same pad reuses the first one's edges
    let scaled = lib
        .evaluate(
            &tree,
            &draw("double_leaf*5", "myHist_1", Binning::Edges(ints.bin_edges().to_vec())),
        )
        .unwrap();
    assert_eq!(scaled.entries(), 200.0);

    let ratio = lib.divide(&scaled, &ints, "ratio_2", true).unwrap();
    let content = ratio.bin_content();
    assert!(content[..5].iter().all(|&r| (r - 2.0).abs() < 1e-12), "{content:?}");
    assert!(content[5..].iter().all(|&r| r == 0.0), "{content:?}");
    assert_eq!(ratio.title, "myHist_1/myHist_0");
}

#[test]
fn selection_string_from_sel_helper() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_input.json");
    DataFile {
        trees: vec![simple_tree()],
    }
    .save(&path)
    .unwrap();

    let mut lib = DataLibrary::new();
    let file = lib.open(&path).unwrap();
    let tree = lib.tree(&file, "simple_tree").unwrap();
    let request = DrawRequest {
        expression: "int_leaf",
        selection: Some("2.00 < int_leaf && int_leaf < 5.00"),
        name: "myHist_0",
        binning: Binning::Fixed {
            bins: 10,
            low: 0.0,
            high: 10.0,
        },
    };
    let hist = lib.evaluate(&tree, &request).unwrap();
    assert_eq!(hist.entries(), 40.0);
    assert_eq!(hist.bin_content()[3], 20.0);
    assert_eq!(hist.bin_content()[4], 20.0);
}
