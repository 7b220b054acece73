//! Property-based tests for sector renormalization and recentering.

use bevy::math::DVec3;
use proptest::prelude::*;

use super::VirtualPosition;
use crate::body::{CelestialBody, MassBody};
use crate::config::OriginConfig;
use crate::test_utils::{assertions, fixtures};
use crate::types::SECTOR_SIZE;

fn delta() -> impl Strategy<Value = DVec3> {
    (-5.0e7f64..5.0e7, -5.0e7f64..5.0e7, -5.0e7f64..5.0e7).prop_map(|(x, y, z)| DVec3::new(x, y, z))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Renormalized positions track the naive running sum and keep the offset inside one sector.
    #[test]
    fn prop_sector_round_trip(deltas in prop::collection::vec(delta(), 1..50)) {
        let mut pos = VirtualPosition::ZERO;
        let mut naive = DVec3::ZERO;
        for d in &deltas {
            pos.move_by(*d, SECTOR_SIZE);
            naive += *d;

            for c in pos.local_offset.to_array() {
                prop_assert!((0.0..SECTOR_SIZE).contains(&c), "offset component {} out of range", c);
            }
            let error = (pos.to_world_position(SECTOR_SIZE) - naive).length();
            // Each step rounds once in the offset and once in the naive sum.
            prop_assert!(error <= 1e-6 * deltas.len() as f64, "error {}", error);
        }
    }

    /// Recentering leaves the tracked absolute position alone and shifts bodies by the inverse local offset.
    #[test]
    fn prop_recenter_invariance(
        travel in delta(),
        positions in prop::collection::vec(delta(), 1..6),
    ) {
        let (registry, _, tracker) = fixtures::origin_stack(OriginConfig::default());
        let bodies: Vec<_> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| CelestialBody::shared(format!("body{i}"), 1.0e20, 1.0, *p))
            .collect();
        for b in &bodies {
            registry.register(b);
        }

        tracker.move_by(travel);
        let world_before = tracker.world_position();
        let local_before = tracker.virtual_position().to_world_position(SECTOR_SIZE);
        let offsets_before = assertions::pairwise_offsets(&registry);

        let offset = tracker.recenter();

        prop_assert_eq!(offset, -local_before);
        prop_assert!((tracker.world_position() - world_before).length() <= 1e-6);
        for (body, start) in bodies.iter().zip(&positions) {
            prop_assert_eq!(body.position(), *start + offset);
        }
        assertions::assert_offsets_preserved(&offsets_before, &assertions::pairwise_offsets(&registry), 1e-6);
    }
}
