// ABOUTME: The classic lookat session against the built-in library and text surface.
// ABOUTME: Opens a file, loads simple_tree, draws two leaves on one canvas and their ratio.

use std::path::{Path, PathBuf};

use lookat_core::{Config, GridFlow, ObjectKind, Plottable};
use lookat_data::{BranchData, DataFile, DataLibrary, TreeData};
use lookat_render::TextSurface;
use lookat_session::{DrawOptions, RatioOptions, Session, SessionError, SessionState};

type TextSession = Session<DataLibrary, TextSurface<Vec<u8>>>;

fn write_test_input(dir: &Path) -> PathBuf {
    let mut int_leaf = Vec::new();
    let mut double_leaf = Vec::new();
    for i in 0..10 {
        for _ in 0..20 {
            int_leaf.push(i as f64);
            double_leaf.push(0.1 * i as f64);
        }
    }
    let path = dir.join("test_input.json");
    DataFile {
        trees: vec![TreeData {
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
        }],
    }
    .save(&path)
    .unwrap();
    path
}

fn session() -> TextSession {
    Session::new(
        Config::default(),
        DataLibrary::new(),
        TextSurface::new(Vec::new(), 100, 32),
    )
}

#[test]
fn draw_two_leaves_and_their_ratio() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_input(dir.path());
    let mut session = session();

    session.add_file(&path).unwrap();
    assert_eq!(session.ls().unwrap(), vec!["simple_tree"]);
    session.load("simple_tree").unwrap();
    assert_eq!(session.state(), SessionState::TreeLoaded);

    let ints = session.draw("int_leaf", DrawOptions::default()).unwrap();
    assert_eq!(session.layout().current().unwrap().grid().to_string(), "1x1");
    let scaled = session.draw("double_leaf*5", DrawOptions::same_pad()).unwrap();
    assert_eq!(session.layout().current().unwrap().grid().to_string(), "1x2");
    let ratio = session.draw_ratio(RatioOptions::default()).unwrap();

    assert_eq!(session.registry().count(ObjectKind::Histogram), 3);
    assert_eq!(session.canvases().len(), 1);
    let canvas = &session.canvases()[0];
    assert_eq!(canvas.pads().len(), 3);
    assert_eq!(canvas.grid().to_string(), "2x2");
    assert_eq!(canvas.position(0), Some((0, 0)));

    let object = session.resolve(&ratio.to_string()).unwrap();
    assert!(ratio > ints && ratio > scaled);
    assert_eq!(object.label(), "ratio_2");
    assert_eq!(object.source(), "myHist_1/myHist_0");
    let content = object.as_histogram().unwrap().bin_content();
    assert!(content[..5].iter().all(|&r| (r - 2.0).abs() < 1e-12));
    assert!(content[5..].iter().all(|&r| r == 0.0));
}

#[test]
fn rendered_canvas_shows_every_pad() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_input(dir.path());
    let mut session = session();
    session.add_file(&path).unwrap();
    session.load("simple_tree").unwrap();
    session.draw("int_leaf", DrawOptions::default()).unwrap();
    session.draw("double_leaf*5", DrawOptions::same_pad()).unwrap();
    session.draw_ratio(RatioOptions::default()).unwrap();

    let output = String::from_utf8_lossy(session.surface().get_ref()).to_string();
    let last = &output[output.rfind("c1 [").unwrap()..];
    assert!(last.starts_with("c1 [2x2]"), "{last}");
    for text in ["1 myHist_0", "2 myHist_1", "3 ratio_2", "x: int_leaf", "x: double_leaf*5  y: ratio"] {
        assert!(last.contains(text), "missing {text:?} in\n{last}");
    }
}

#[test]
fn same_pad_draws_never_run_out_of_room() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_input(dir.path());
    for flow in [GridFlow::Square, GridFlow::Row, GridFlow::Column] {
        let mut config = Config::default();
        config.layout.grid_flow = flow;
        let mut session = Session::new(config, DataLibrary::new(), TextSurface::new(Vec::new(), 100, 32));
        session.add_file(&path).unwrap();
        session.load("simple_tree").unwrap();

        for i in 0..40 {
            let result = session.draw("int_leaf", DrawOptions::same_pad());
            assert!(result.is_ok(), "{flow:?}: draw #{i} failed: {result:?}");
        }
        assert!(session.draw_ratio(RatioOptions::default()).is_ok());
        assert_eq!(session.registry().count(ObjectKind::Histogram), 41);
        assert_eq!(session.canvases().len(), 1);
        assert_eq!(session.canvases()[0].pads().len(), 41);

        let output = String::from_utf8_lossy(session.surface().get_ref()).to_string();
        let last = &output[output.rfind("c1 [").unwrap()..];
        assert!(last.contains("more pads not shown:"), "{flow:?}:\n{last}");
        assert!(last.contains("ratio_40"), "{flow:?}:\n{last}");
    }
}

#[test]
fn efficiency_correction_with_legend_and_normalisation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_input(dir.path());
    let mut session = session();
    session.add_file(&path).unwrap();
    session.load("simple_tree").unwrap();

    session.draw("int_leaf", DrawOptions::default()).unwrap();
    let low = DrawOptions {
        selection: Some("int_leaf < 5".to_string()),
        ..DrawOptions::same_pad()
    };
    session.draw("int_leaf", low).unwrap();
    let raw = RatioOptions {
        normalised: Some(false),
        ..RatioOptions::default()
    };
    session.draw_ratio(raw).unwrap();

    session
        .legend(&["all".to_string(), "low".to_string()])
        .unwrap();
    let output = String::from_utf8_lossy(session.surface().get_ref()).to_string();
    let last = &output[output.rfind("c1 [").unwrap()..];
    assert!(last.contains("1 myHist_0 [all]"), "{last}");
    assert!(last.contains("2 myHist_1 [low]"), "{last}");

    let corrected = session
        .draw_corrected("int_leaf", "ratio_2", DrawOptions::default())
        .unwrap();
    let plot = session.resolve(&corrected.to_string()).unwrap().as_histogram().unwrap();
    assert_eq!(plot.bin_content()[..5], [20.0; 5]);
    assert!(plot.bin_content()[5..].iter().all(|&c| c == 0.0));

    assert_eq!(session.normalise().unwrap(), corrected);
    let plot = session.resolve(&corrected.to_string()).unwrap().as_histogram().unwrap();
    assert!(plot.bin_content()[..5].iter().all(|&c| (c - 0.2).abs() < 1e-12));
    let output = String::from_utf8_lossy(session.surface().get_ref()).to_string();
    let last = &output[output.rfind("c2 [").unwrap()..];
    assert!(last.contains("y: normalised to unity"), "{last}");
}

#[test]
fn closing_the_file_keeps_histograms() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_input(dir.path());
    let mut session = session();
    session.add_file(&path).unwrap();
    let tree = session.load("simple_tree").unwrap();
    let hist = session.draw("int_leaf", DrawOptions::default()).unwrap();

    session.close_file(None).unwrap();
    assert!(matches!(
        session.resolve(&tree.to_string()),
        Err(SessionError::StaleReference { .. })
    ));
    assert_eq!(session.resolve(&hist.to_string()).unwrap().handle(), hist);
    assert_eq!(session.library().open_files(), 0);
}

#[test]
fn chain_over_two_copies_doubles_entries() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_test_input(dir.path());
    let second = dir.path().join("copy.json");
    std::fs::copy(&first, &second).unwrap();

    let mut session = session();
    session.create_chain("simple_tree", &[first, second]).unwrap();
    let h = session.draw("int_leaf", DrawOptions::default()).unwrap();
    let plot = session.resolve(&h.to_string()).unwrap().as_histogram().unwrap();
    assert_eq!(plot.entries(), 400.0);
    assert!(plot.bin_content().iter().all(|&c| c == 40.0));
}

#[test]
fn bad_expression_names_itself() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_input(dir.path());
    let mut session = session();
    session.add_file(&path).unwrap();
    session.load("simple_tree").unwrap();
    let err = session.draw("int_leaf +", DrawOptions::default()).unwrap_err();
    assert!(err.to_string().contains("int_leaf +"), "{err}");
    let err = session.draw("no_such_leaf", DrawOptions::default()).unwrap_err();
    assert!(matches!(err, SessionError::Expression { .. }));
}
