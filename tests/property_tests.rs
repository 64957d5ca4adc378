// tests/property_tests.rs
//! Property tests for calibration mapping, conditioning and protocol labelling

use proptest::prelude::*;
use pureit_core::adc_to_angle;
use pureit_core::config::EmgConfig;
use pureit_core::processing::conditioning::{moving_average_same, remove_dc};
use pureit_core::processing::{EmgConditioner, ProtocolSchedule};

fn calibration_range() -> impl Strategy<Value = (i32, i32)> {
    (0i32..900, 1i32..600).prop_map(|(lo, span)| (lo, lo + span))
}

proptest! {
    #[test]
    fn angle_is_monotonic_in_reading((lo, hi) in calibration_range(), a in -200i32..1300, b in -200i32..1300) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(adc_to_angle(low, lo, hi) <= adc_to_angle(high, lo, hi));
    }

    #[test]
    fn angle_saturates_outside_calibration((lo, hi) in calibration_range(), below in 0i32..500, above in 0i32..500) {
        prop_assert_eq!(adc_to_angle(lo - below, lo, hi), 0.0);
        prop_assert_eq!(adc_to_angle(hi + above, lo, hi), 180.0);
    }

    #[test]
    fn angle_ignores_clamping((lo, hi) in calibration_range(), v in -200i32..1300) {
        let clamped = v.clamp(lo, hi);
        let angle = adc_to_angle(v, lo, hi);
        prop_assert_eq!(angle, adc_to_angle(clamped, lo, hi));
        prop_assert!((0.0..=180.0).contains(&angle));
    }

    #[test]
    fn dc_removal_centres_batch(batch in prop::collection::vec(0.0f64..1024.0, 1..300)) {
        let centred = remove_dc(&batch);
        prop_assert_eq!(centred.len(), batch.len());
        let mean = centred.iter().sum::<f64>() / centred.len() as f64;
        prop_assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn moving_average_keeps_length(signal in prop::collection::vec(0.0f64..10.0, 0..300), window in 1usize..250) {
        let averaged = moving_average_same(&signal, window);
        prop_assert_eq!(averaged.len(), signal.len());
        // Averages of non-negative values stay within the input range
        let max = signal.iter().cloned().fold(0.0, f64::max);
        prop_assert!(averaged.iter().all(|&v| v >= -1e-9 && v <= max + 1e-9));
    }

    #[test]
    fn conditioning_preserves_batch_length(batch in prop::collection::vec(0.0f64..1024.0, 1..400)) {
        let conditioner = EmgConditioner::new(&EmgConfig::default()).unwrap();
        let conditioned = conditioner.condition(&batch).unwrap();
        prop_assert_eq!(conditioned.filtered.len(), batch.len());
        prop_assert_eq!(conditioned.envelope.len(), batch.len());
        prop_assert!(conditioned.filtered.iter().chain(&conditioned.envelope).all(|v| v.is_finite()));
    }

    #[test]
    fn labels_only_inside_analysis_window(t in -5.0f64..40.0) {
        let schedule = ProtocolSchedule::default();
        let labelled = schedule.label(t).is_some();
        prop_assert_eq!(labelled, (schedule.analysis_start_s..=schedule.analysis_end_s).contains(&t));
    }
}
