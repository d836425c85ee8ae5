//! Fair winner selection and the rotation that makes the wheel land on it.
//!
//! Wedge `i` spans `[i * seg, (i + 1) * seg)` in the wheel's own frame and the
//! pointer sits at angle 0 of the screen frame. The winner is fixed before any
//! animation runs; the rotation is derived from it, never the other way round.

use crate::config::{EXTRA_REVOLUTIONS, JITTER_FRACTION, MIN_SPIN_OPTIONS};
use crate::{DecisionError, Stage};
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Outcome of one spin, computed up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinPlan {
    pub winner_index: usize,
    /// Absolute rotation the wheel animates to; always above the start rotation.
    pub target_rotation_deg: f64,
    /// Offset from the wedge centre, within `±JITTER_FRACTION * seg`.
    pub jitter_deg: f64,
}

#[inline]
pub fn segment_angle(count: usize) -> f64 {
    360.0 / count as f64
}

/// Use `forced_index` when it is in bounds, otherwise draw uniformly.
pub fn pick_winner<R: Rng + ?Sized>(count: usize, forced_index: Option<usize>, rng: &mut R) -> usize {
    match forced_index {
        Some(i) if i < count => i,
        _ => rng.random_range(0..count),
    }
}

/// Pick a winner and the rotation that lands on it.
pub fn plan_spin<R: Rng + ?Sized>(
    count: usize,
    current_rotation_deg: f64,
    forced_index: Option<usize>,
    rng: &mut R,
) -> Result<SpinPlan, DecisionError> {
    if count < MIN_SPIN_OPTIONS {
        return Err(DecisionError::InsufficientOptions {
            stage: Stage::Spin,
            needed: MIN_SPIN_OPTIONS,
            found: count,
        });
    }
    let winner_index = pick_winner(count, forced_index, rng);
    let jitter_unit = match Uniform::new_inclusive(-1.0, 1.0) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    };
    let plan = aim(count, current_rotation_deg, winner_index, jitter_unit);
    debug!(
        "Spin over {} options: winner {} at {:.2}deg (jitter {:+.2})",
        count, winner_index, plan.target_rotation_deg, plan.jitter_deg
    );
    Ok(plan)
}

/// Rotation geometry for a known winner. `jitter_unit` is clamped to `[-1, 1]`
/// and scaled to the allowed in-wedge offset.
pub fn aim(count: usize, current_rotation_deg: f64, winner_index: usize, jitter_unit: f64) -> SpinPlan {
    let seg = segment_angle(count);
    let wedge_center = (winner_index as f64 + 0.5) * seg;
    let angle_needed = (360.0 - (wedge_center + current_rotation_deg).rem_euclid(360.0)).rem_euclid(360.0);
    let jitter_deg = jitter_unit.clamp(-1.0, 1.0) * JITTER_FRACTION * seg;
    let target_rotation_deg =
        current_rotation_deg + f64::from(EXTRA_REVOLUTIONS) * 360.0 + angle_needed + jitter_deg;

    SpinPlan {
        winner_index,
        target_rotation_deg,
        jitter_deg,
    }
}

/// Index of the wedge under the pointer once the wheel sits at `rotation_deg`.
pub fn wedge_at_pointer(rotation_deg: f64, count: usize) -> usize {
    let seg = segment_angle(count);
    let local = (-rotation_deg).rem_euclid(360.0);
    (local / seg).floor() as usize % count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn one_option_is_refused() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            plan_spin(1, 0.0, None, &mut rng),
            Err(DecisionError::InsufficientOptions {
                stage: Stage::Spin,
                needed: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn forced_index_out_of_bounds_falls_back_to_random() {
        let mut rng = StdRng::seed_from_u64(3);
        let plan = plan_spin(3, 0.0, Some(9), &mut rng).unwrap();
        assert!(plan.winner_index < 3);
    }

    #[test]
    fn centred_spin_from_rest() {
        // four wedges of 90deg; wedge 1 centre is at 135deg
        let plan = aim(4, 0.0, 1, 0.0);
        assert_eq!(plan.target_rotation_deg, 1800.0 + 225.0);
        assert_eq!(wedge_at_pointer(plan.target_rotation_deg, 4), 1);
    }

    #[test]
    fn consecutive_spins_continue_from_previous_rotation() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut rotation = 0.0;
        for forced in [2, 0, 4, 4, 1] {
            let plan = plan_spin(5, rotation, Some(forced), &mut rng).unwrap();
            assert!(plan.target_rotation_deg > rotation);
            assert_eq!(wedge_at_pointer(plan.target_rotation_deg, 5), forced);
            rotation = plan.target_rotation_deg;
        }
    }

    #[test]
    fn random_winners_cover_every_wedge() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen = [false; 6];
        for _ in 0..500 {
            let plan = plan_spin(6, 0.0, None, &mut rng).unwrap();
            seen[plan.winner_index] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    proptest! {
        #[test]
        fn rotation_decodes_to_selected_wedge(
            count in 2usize..=12,
            pick in 0usize..12,
            current in 0.0f64..1_000_000.0,
            jitter_unit in -1.0f64..=1.0,
        ) {
            let winner = pick % count;
            let plan = aim(count, current, winner, jitter_unit);
            prop_assert_eq!(wedge_at_pointer(plan.target_rotation_deg, count), winner);
            prop_assert!(plan.target_rotation_deg > current);
        }

        #[test]
        fn extreme_jitter_stays_inside_wedge(
            count in 2usize..=12,
            pick in 0usize..12,
            current in 0.0f64..100_000.0,
            sign in prop::bool::ANY,
        ) {
            let winner = pick % count;
            let unit = if sign { 1.0 } else { -1.0 };
            let plan = aim(count, current, winner, unit);
            let seg = segment_angle(count);
            prop_assert!((plan.jitter_deg.abs() - 0.4 * seg).abs() < 1e-9);
            prop_assert_eq!(wedge_at_pointer(plan.target_rotation_deg, count), winner);
        }

        #[test]
        fn seeded_spins_land_on_their_winner(
            count in 2usize..=12,
            seed in any::<u64>(),
            current in 0.0f64..100_000.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_spin(count, current, None, &mut rng).unwrap();
            prop_assert!(plan.winner_index < count);
            prop_assert!(plan.jitter_deg.abs() <= 0.4 * segment_angle(count) + 1e-9);
            prop_assert_eq!(wedge_at_pointer(plan.target_rotation_deg, count), plan.winner_index);
        }
    }
}
