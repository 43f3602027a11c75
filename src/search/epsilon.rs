//! Carbon ceilings for the epsilon-constraint sweep

/// Minimum carbon plus slack, so the cost re-solve keeps a feasible margin
/// even when the minimum is zero or negative.
pub fn carbon_ceiling(carbon_min: f64, relative_slack: f64, absolute_tolerance: f64) -> f64 {
    carbon_min + (carbon_min.abs() * relative_slack).max(absolute_tolerance)
}

/// Ceilings for `interior` interior points plus the carbon end of the front.
///
/// The span `[floor, carbon_max)` is cut into `interior + 1` equal intervals
/// and the ceilings are returned from loosest to tightest, ending at `floor`.
/// A span that is empty or inverted collapses every ceiling onto `floor`.
pub fn epsilon_schedule(floor: f64, carbon_max: f64, interior: usize) -> Vec<f64> {
    let interval = (carbon_max - floor).max(0.0) / (interior + 1) as f64;
    (0..=interior)
        .rev()
        .map(|k| floor + k as f64 * interval)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ceiling_slack() {
        assert!((carbon_ceiling(100.0, 0.01, 1e-6) - 101.0).abs() < 1e-12);
        assert!((carbon_ceiling(-50.0, 0.01, 1e-6) + 49.5).abs() < 1e-12);
        assert_eq!(carbon_ceiling(0.0, 0.01, 1e-6), 1e-6);
    }

    #[test]
    fn test_schedule_example() {
        let steps = epsilon_schedule(10.0, 40.0, 2);
        assert_eq!(steps, vec![30.0, 20.0, 10.0]);
    }

    #[test]
    fn test_zero_interior_points() {
        assert_eq!(epsilon_schedule(3.0, 9.0, 0), vec![3.0]);
    }

    #[test]
    fn test_inverted_span_collapses() {
        assert_eq!(epsilon_schedule(5.0, 4.0, 3), vec![5.0; 4]);
    }

    proptest! {
        #[test]
        fn schedule_is_decreasing_and_within_span(
            floor in -1e4f64..1e4,
            span in 1e-3f64..1e4,
            interior in 0usize..40,
        ) {
            let carbon_max = floor + span;
            let steps = epsilon_schedule(floor, carbon_max, interior);
            prop_assert_eq!(steps.len(), interior + 1);
            prop_assert_eq!(*steps.last().unwrap(), floor);
            for pair in steps.windows(2) {
                prop_assert!(pair[0] > pair[1]);
            }
            prop_assert!(steps[0] < carbon_max);
            prop_assert!(steps.iter().all(|e| *e >= floor));
        }

        #[test]
        fn ceiling_is_above_minimum(
            carbon_min in -1e6f64..1e6,
            slack in 0.0f64..0.5,
        ) {
            prop_assert!(carbon_ceiling(carbon_min, slack, 1e-6) > carbon_min);
        }
    }
}
