//! Versioned checkpoint and history files.

mod common;

use approx::assert_abs_diff_eq;
use cv_costvol::checkpoint::{self, LossHistory, TrendMethod, VersionStore};
use cv_costvol::prelude::*;
use tempfile::tempdir;

#[test]
fn empty_store_starts_at_version_one() {
    let root = tempdir().unwrap();
    let store = VersionStore::new(root.path(), "GDNet_mdc6f").unwrap();

    assert!(store.dir().is_dir());
    assert_eq!(store.latest_version().unwrap(), None);
    assert_eq!(store.load_weights(None).unwrap(), (1, None));
    assert_eq!(store.load_history(None).unwrap(), (1, LossHistory::default()));
}

#[test]
fn saved_versions_are_found_and_loaded() {
    let root = tempdir().unwrap();
    let store = VersionStore::new(root.path(), "LEAStereo_fdc").unwrap();

    let early = LossHistory { train: vec![3.0, 2.0], test: vec![2.5] };
    let late = LossHistory { train: vec![3.0, 2.0, 1.0], test: vec![2.5, 1.5] };
    store.save_version(b"early", &early, 3).unwrap();
    store.save_version(b"late", &late, 12).unwrap();

    assert_eq!(
        store.model_file_name(12),
        root.path().join("LEAStereo_fdc").join("LEAStereo_fdc-12.nn")
    );
    assert_eq!(store.latest_version().unwrap(), Some(12));

    let (next, weights) = store.load_weights(None).unwrap();
    assert_eq!(next, 13);
    assert_eq!(weights.unwrap(), b"late".to_vec());

    let (next, history) = store.load_history(Some(3)).unwrap();
    assert_eq!(next, 4);
    assert_eq!(history, early);
}

#[test]
fn missing_requested_version_is_fatal() {
    let root = tempdir().unwrap();
    let store = VersionStore::new(root.path(), "GDNet_sdc6").unwrap();
    store.save_version(b"w", &LossHistory::default(), 1).unwrap();

    match store.load_weights(Some(5)) {
        Err(Error::MissingCheckpoint(path)) => assert!(path.ends_with("GDNet_sdc6-5.nn")),
        other => panic!("unexpected {:?}", other)
    }

    std::fs::remove_file(store.history_file_name(1)).unwrap();
    assert!(matches!(store.load_history(None), Err(Error::MissingHistory(_))));
}

#[test]
fn profile_names_cannot_contain_dashes() {
    let root = tempdir().unwrap();
    assert!(matches!(
        VersionStore::new(root.path(), "GDNet-mdc6"),
        Err(Error::InvalidProfileName(_))
    ));
}

#[test]
fn loss_trend_detects_descent() {
    let falling = [4.0f32, 3.0, 2.0, 1.0];
    assert_abs_diff_eq!(checkpoint::trend(&falling, TrendMethod::Slope).unwrap(), -1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(checkpoint::trend(&falling, TrendMethod::Correlation).unwrap(), -1.0, epsilon = 1e-6);

    let flat = [2.0f32, 2.0, 2.0];
    assert_abs_diff_eq!(checkpoint::trend(&flat, TrendMethod::Slope).unwrap(), 0.0, epsilon = 1e-6);
    assert_eq!(checkpoint::trend(&flat, TrendMethod::Correlation), None);

    assert_eq!(checkpoint::trend(&[1.0], TrendMethod::Slope), None);

    let history = LossHistory { train: vec![1.0, 2.0], test: vec![] };
    assert!(history.train_trend(TrendMethod::Slope).unwrap() > 0.0);
    assert_eq!(history.test_trend(TrendMethod::Slope), None);
}

#[test]
fn profile_loads_from_its_own_directory() {
    let root = tempdir().unwrap();
    let mut profile = Profile::new(Box::new(common::ScriptedModel::new(4, vec![]))).unwrap();

    let store = profile.version_store(root.path()).unwrap();
    assert_eq!(store.dir(), root.path().join("Scripted").as_path());
    assert_eq!(profile.load_model(&store, None).unwrap(), 1);

    store.save_version(b"weights", &LossHistory::default(), 2).unwrap();
    assert_eq!(profile.load_model(&store, None).unwrap(), 3);
    assert!(matches!(profile.load_model(&store, Some(9)), Err(Error::MissingCheckpoint(_))));
}

#[test]
fn configured_version_selects_the_checkpoint() {
    let root = tempdir().unwrap();
    let mut profile = Profile::new(Box::new(common::ScriptedModel::new(4, vec![]))).unwrap();

    let store = profile.version_store(root.path()).unwrap();
    store.save_version(b"old", &LossHistory::default(), 2).unwrap();
    store.save_version(b"new", &LossHistory::default(), 5).unwrap();

    let pinned = EvalParams::from_toml_str("max_disparity = 4\nversion = 2").unwrap();
    assert_eq!(profile.load_checkpoint(root.path(), &pinned).unwrap(), 3);

    let latest = EvalParams::from_toml_str("max_disparity = 4").unwrap();
    assert_eq!(profile.load_checkpoint(root.path(), &latest).unwrap(), 6);

    let missing = EvalParams::from_toml_str("max_disparity = 4\nversion = 4").unwrap();
    assert!(matches!(profile.load_checkpoint(root.path(), &missing), Err(Error::MissingCheckpoint(_))));
}
