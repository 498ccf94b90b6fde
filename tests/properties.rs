//! Property tests for the measurement and estimation core.

use std::time::Duration;

use iris_depth::calibration::CalibrationOutcome;
use iris_depth::depth::estimate_depth_mm;
use iris_depth::fps::FrameRateMonitor;
use iris_depth::geometry::{iris_apparent_size_px, IrisLandmarkSet, IRIS_MESH_LANDMARKS};
use iris_depth::{
    process_frame, CalibrationState, Detection, FaceLandmarks, Point, Resolution, SessionConfig,
    SessionState,
};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Point> {
    (0.0f32..1.0, 0.0f32..1.0).prop_map(|(x, y)| Point::new(x, y))
}

fn fps_window() -> Duration {
    Duration::from_millis(2000)
}

fn emissions(timestamps_ms: &[u64]) -> usize {
    let mut monitor = FrameRateMonitor::new(fps_window());
    timestamps_ms
        .iter()
        .filter_map(|&ms| monitor.tick(Duration::from_millis(ms)))
        .count()
}

proptest! {
    #[test]
    fn coincident_points_measure_zero(
        w in 1u32..8000,
        h in 1u32..8000,
        p in point(),
    ) {
        prop_assert_eq!(iris_apparent_size_px(w, h, p, p, p, p), 0.0);
    }

    #[test]
    fn size_ignores_point_order_within_a_chord(
        w in 1u32..8000,
        h in 1u32..8000,
        medial in point(),
        lateral in point(),
        superior in point(),
        inferior in point(),
    ) {
        let forward = iris_apparent_size_px(w, h, medial, lateral, superior, inferior);
        let swapped = iris_apparent_size_px(w, h, lateral, medial, inferior, superior);
        prop_assert_eq!(forward, swapped);
        prop_assert!(forward >= 0.0);
    }

    #[test]
    fn depth_decreases_as_iris_grows(
        focal in 1.0f64..1e5,
        p1 in 0.01f64..1e3,
        delta in 0.01f64..1e3,
    ) {
        let near = estimate_depth_mm(Some(focal), p1 + delta).mm().unwrap();
        let far = estimate_depth_mm(Some(focal), p1).mm().unwrap();
        prop_assert!(far > near);
    }

    #[test]
    fn calibrating_then_estimating_returns_reference(
        distance_mm in 50.0f64..2000.0,
        iris_px in 1.0f64..500.0,
    ) {
        let mut state = CalibrationState::new(distance_mm);
        state.request(true).unwrap();
        let CalibrationOutcome::Calibrated(calibration) = state.consume_pending(iris_px) else {
            panic!("calibration did not complete");
        };
        prop_assert!(!state.is_pending());
        prop_assert_eq!(calibration.baseline_iris_px, iris_px);

        let depth = estimate_depth_mm(state.focal_length_px(), iris_px).mm().unwrap();
        prop_assert!((depth - distance_mm).abs() <= distance_mm * 1e-12);

        // no second request, no recomputation
        prop_assert_eq!(state.consume_pending(iris_px * 2.0), CalibrationOutcome::Idle);
        prop_assert_eq!(state.focal_length_px(), Some(calibration.focal_length_px));
    }

    #[test]
    fn switching_eye_always_clears_focal_length(
        calibrate in any::<bool>(),
        switches_before in 0usize..3,
        iris_px in 5.0f32..80.0,
    ) {
        let mut state = SessionState::new(&SessionConfig::default());
        for _ in 0..switches_before {
            state.switch_laterality();
        }
        if calibrate {
            state.request_calibration(true).unwrap();
            let set = IrisLandmarkSet::for_eye(state.laterality());
            let r = iris_px / 2000.0;
            let mut points = vec![Point::new(0.5, 0.5); IRIS_MESH_LANDMARKS];
            points[set.lateral] = Point::new(0.5 + r, 0.5);
            points[set.medial] = Point::new(0.5 - r, 0.5);
            points[set.superior] = Point::new(0.5, 0.5 - r);
            points[set.inferior] = Point::new(0.5, 0.5 + r);
            let detection = Detection::new(Resolution::new(1000, 1000), vec![FaceLandmarks::new(points)]);
            let (next, _) = process_frame(state, &detection, Duration::ZERO);
            state = next;
            prop_assert!(state.calibration().focal_length_px().is_some());
        }

        let before = state.laterality();
        state.switch_laterality();
        prop_assert_eq!(state.laterality(), before.toggled());
        prop_assert_eq!(state.calibration().focal_length_px(), None);
    }

    #[test]
    fn no_average_within_one_window(gaps in prop::collection::vec(1u64..=20, 1..100)) {
        // at most 99 gaps of 20 ms, always under 2000 ms
        let timestamps: Vec<u64> = std::iter::once(0)
            .chain(gaps.iter().scan(0, |t, g| {
                *t += g;
                Some(*t)
            }))
            .collect();
        prop_assert_eq!(emissions(&timestamps), 0);
    }

    #[test]
    fn one_average_for_spans_between_one_and_two_windows(
        end in 2000u64..4000,
        interior in prop::collection::vec(0.0f64..1.0, 0..120),
    ) {
        let mut timestamps: Vec<u64> = interior
            .iter()
            .map(|f| (f * end as f64) as u64)
            .collect();
        timestamps.push(0);
        timestamps.push(end);
        timestamps.sort_unstable();
        prop_assert_eq!(emissions(&timestamps), 1);
    }
}
