//! Error rate rules and run aggregation.

use approx::assert_abs_diff_eq;
use cv_costvol::metrics::{self, BatchMetrics, Dataset, ErrorCounts, ErrorPredicate, RunMetrics};
use cv_costvol::Error;
use ndarray::{arr2, Array2};

#[test]
fn kitti_needs_both_absolute_and_relative_error() {
    let kitti = Dataset::Kitti2015.error_predicate();

    assert!(kitti.is_error(13.5, 10.0));
    assert!(!kitti.is_error(97.0, 100.0));
    assert!(!kitti.is_error(12.9, 10.0));
}

#[test]
fn synthetic_and_aerial_use_one_pixel_threshold() {
    for dataset in [Dataset::FlyingThings3D, Dataset::AerialImagery].iter() {
        let predicate = dataset.error_predicate();
        assert_eq!(predicate, ErrorPredicate::Absolute { threshold: 1.0 });
        assert!(predicate.is_error(11.0, 10.0));
        assert!(!predicate.is_error(10.99, 10.0));
    }
}

#[test]
fn dataset_names_round_trip_and_unknown_names_fail() {
    for name in [
        "flyingthings3D",
        "KITTI_2015",
        "KITTI_2015_benchmark",
        "KITTI_2015_Augmentation",
        "KITTI_2012_Augmentation",
        "AerialImagery"
    ].iter() {
        let dataset: Dataset = name.parse().unwrap();
        assert_eq!(dataset.to_string(), *name);
    }

    assert!(Dataset::Kitti2012Augmentation.is_kitti());
    assert!(!Dataset::AerialImagery.is_kitti());

    match "Middlebury".parse::<Dataset>() {
        Err(Error::UnknownDataset(name)) => assert_eq!(name, "Middlebury"),
        other => panic!("unexpected {:?}", other)
    }
}

#[test]
fn valid_mask_excludes_unknown_and_out_of_range() {
    let gt = arr2(&[[0.0f32, 5.0, 191.0, 190.5, -1.0]]);
    let mask = metrics::valid_mask(gt.view(), 192);

    assert_eq!(mask, arr2(&[[false, true, false, true, false]]));
}

#[test]
fn score_counts_only_valid_pixels() {
    let pred = arr2(&[[10.0f32, 20.0, 33.0, 7.0]]);
    let gt = arr2(&[[10.5f32, 0.0, 30.0, 3.0]]);
    let valid = metrics::valid_mask(gt.view(), 192);

    let counts = metrics::score(pred.view(), gt.view(), valid.view(), Dataset::FlyingThings3D.error_predicate());
    assert_eq!(counts.valid_count, 3);
    assert_eq!(counts.error_count, 2);
    assert_abs_diff_eq!(counts.epe(), (0.5 + 3.0 + 4.0) / 3.0, epsilon = 1e-6);

    let counts = metrics::score(pred.view(), gt.view(), valid.view(), Dataset::Kitti2015.error_predicate());
    assert_eq!(counts.error_count, 2);
}

#[test]
fn empty_valid_set_has_nan_epe() {
    let gt = Array2::<f32>::zeros((3, 3));
    let valid = metrics::valid_mask(gt.view(), 192);
    let counts = metrics::score(gt.view(), gt.view(), valid.view(), Dataset::Kitti2015.error_predicate());

    assert_eq!(counts.valid_count, 0);
    assert!(counts.epe().is_nan());
}

#[test]
fn error_rate_aggregates_counts_not_rates() {
    let a = ErrorCounts { abs_error_sum: 0.0, error_count: 1, valid_count: 10 };
    let b = ErrorCounts { abs_error_sum: 0.0, error_count: 1, valid_count: 2 };

    let rate = metrics::aggregate_error_rate(&[a, b]);
    assert_abs_diff_eq!(rate, 2.0 / 12.0, epsilon = 1e-6);
    assert!((rate - 0.3).abs() > 0.1);

    let mut run = RunMetrics::new();
    for (errors, valid) in [(1, 10), (1, 2)].iter() {
        run.push(&BatchMetrics {
            epe: 1.0,
            error_count: *errors,
            valid_count: *valid,
            mean_confidence_error: None
        });
    }
    assert_abs_diff_eq!(run.summary().error_rate, 2.0 / 12.0, epsilon = 1e-6);
}

#[test]
fn summary_reports_population_std_and_confidence() {
    let mut run = RunMetrics::new();
    run.push(&BatchMetrics { epe: 1.0, error_count: 0, valid_count: 4, mean_confidence_error: Some(0.2) });
    run.push(&BatchMetrics { epe: 3.0, error_count: 4, valid_count: 4, mean_confidence_error: Some(0.4) });

    let summary = run.summary();
    assert_eq!(summary.count, 2);
    assert_abs_diff_eq!(summary.mean_loss, 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(summary.std_loss, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(summary.error_rate, 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(summary.mean_confidence_error.unwrap(), 0.3, epsilon = 1e-6);

    let report = summary.to_string();
    assert!(report.contains("avg error rates = 50.00%"));
    assert!(report.contains("avg confidence error = 0.300"));
    assert!(report.ends_with("Number of test case: 2"));
}
