//! Squeeze regression and friends.

mod common;

use approx::assert_abs_diff_eq;
use common::peaked_cost;
use cv_costvol::cost_volume::CostVolume;
use cv_costvol::regression::{self, Squeeze};
use ndarray::{Array1, Array3, Array4};

fn pseudo_random_cost(max_disparity: usize, height: usize, width: usize) -> CostVolume {
    CostVolume::new(Array4::from_shape_fn((2, max_disparity, height, width), |(b, d, y, x)| {
        let h = (b * 31 + d * 7919 + y * 104_729 + x * 15_485_863) % 1009;
        (h as f32 / 1009.0 - 0.5) * 12.0
    }))
    .unwrap()
}

#[test]
fn peak_at_fifty_regresses_to_fifty() {
    let cost = peaked_cost(1, 192, 1, 1, 50, 10.0);
    let center = cost.argmax();
    assert_eq!(center[[0, 0, 0]], 50);

    let (_, disp) = regression::squeeze_disparity(&cost, &center, Squeeze::default());
    assert!((disp[[0, 0, 0]] - 50.0).abs() <= 2.0);
    assert_abs_diff_eq!(disp[[0, 0, 0]], 50.0, epsilon = 1e-4);
}

#[test]
fn output_stays_within_disparity_range() {
    let max_disparity = 24;
    let cost = pseudo_random_cost(max_disparity, 5, 7);
    let center = cost.argmax();
    let upper = (max_disparity - 1) as f32;

    for squeeze in [Squeeze::Window { radius: 2 }, Squeeze::Window { radius: 40 }, Squeeze::Gradient].iter() {
        let (_, disp) = regression::squeeze_disparity(&cost, &center, *squeeze);
        assert!(disp.iter().all(|&d| d >= 0.0 && d <= upper), "{:?}", squeeze);
    }

    let disp = regression::expectation(&cost.softmax());
    assert!(disp.iter().all(|&d| d >= 0.0 && d <= upper));

    let disp = regression::argmax_disparity(&cost);
    assert!(disp.iter().all(|&d| d >= 0.0 && d <= upper));
}

#[test]
fn window_truncates_at_range_ends() {
    let squeeze = Squeeze::Window { radius: 2 };

    let low = peaked_cost(1, 8, 1, 1, 0, 10.0);
    let mask = regression::squeeze_mask(&low.softmax(), &low.argmax(), squeeze);
    let kept: Vec<bool> = mask.iter().cloned().collect();
    assert_eq!(kept, vec![true, true, true, false, false, false, false, false]);

    let high = peaked_cost(1, 8, 1, 1, 7, 10.0);
    let mask = regression::squeeze_mask(&high.softmax(), &high.argmax(), squeeze);
    let kept: Vec<bool> = mask.iter().cloned().collect();
    assert_eq!(kept, vec![false, false, false, false, false, true, true, true]);

    let (_, disp) = regression::squeeze_disparity(&high, &high.argmax(), squeeze);
    assert!(disp[[0, 0, 0]] <= 7.0);
    assert!(disp[[0, 0, 0]] > 6.9);
}

#[test]
fn gradient_squeeze_follows_descending_probability() {
    let lane = Array1::from(vec![0.3f32, 0.1, 0.4, 0.15, 0.05, 0.0]);
    let prob = CostVolume::new(lane.into_shape((1, 6, 1, 1)).unwrap()).unwrap();
    let center = Array3::from_elem((1, 1, 1), 2usize);

    let mask = regression::squeeze_mask(&prob, &center, Squeeze::Gradient);
    let kept: Vec<bool> = mask.iter().cloned().collect();
    assert_eq!(kept, vec![false, true, true, true, true, true]);
}

#[test]
fn squeeze_ignores_competing_peak_outside_window() {
    // Two equal peaks: full expectation lands between them, squeeze stays on the first.
    let cost = CostVolume::new(Array4::from_shape_fn((1, 32, 1, 1), |(_, d, _, _)| {
        if d == 5 || d == 25 { 10.0 } else { 0.0 }
    }))
    .unwrap();

    let full = regression::expectation(&cost.softmax());
    assert!((full[[0, 0, 0]] - 15.0).abs() < 0.5);

    let (_, squeezed) = regression::squeeze_disparity(&cost, &cost.argmax(), Squeeze::default());
    assert_abs_diff_eq!(squeezed[[0, 0, 0]], 5.0, epsilon = 1e-3);
}

#[test]
fn sharp_peaks_regress_within_radius_and_are_stable() {
    let max_disparity = 64;
    let radius = 2;

    for peak in [0usize, 1, 13, 40, 62, 63].iter() {
        let cost = peaked_cost(1, max_disparity, 1, 1, *peak, 30.0);
        let (_, disp) = regression::squeeze_disparity(&cost, &cost.argmax(), Squeeze::Window { radius });
        let d = disp[[0, 0, 0]];
        assert!((d - *peak as f32).abs() <= radius as f32);

        // Feeding the prediction back as a peaked volume gives the same answer
        let again = peaked_cost(1, max_disparity, 1, 1, d.round() as usize, 30.0);
        let (_, disp2) = regression::squeeze_disparity(&again, &again.argmax(), Squeeze::Window { radius });
        assert_abs_diff_eq!(disp2[[0, 0, 0]], d, epsilon = 1e-3);
    }
}
