//! Property-based tests for registry consistency.

use std::collections::HashSet;
use std::sync::Arc;

use bevy::math::DVec3;
use proptest::prelude::*;

use crate::body::CelestialBody;
use crate::registry::BodyRegistry;

#[derive(Clone, Debug)]
enum Op {
    Register(usize),
    Unregister(usize),
    Drop(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..8).prop_map(Op::Register),
        2 => (0usize..8).prop_map(Op::Unregister),
        1 => (0usize..8).prop_map(Op::Drop),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The body list and lookup always hold the same names, each once.
    #[test]
    fn prop_registry_stays_consistent(ops in prop::collection::vec(op(), 1..100)) {
        let registry = BodyRegistry::new();
        let mut owners: Vec<Option<Arc<CelestialBody>>> = vec![None; 8];

        for op in ops {
            match op {
                Op::Register(i) => {
                    let body = owners[i]
                        .get_or_insert_with(|| CelestialBody::shared(format!("b{i}"), 1.0e20, 1.0, DVec3::ZERO))
                        .clone();
                    registry.register(&body);
                }
                Op::Unregister(i) => {
                    registry.unregister_by_name(&format!("b{i}"));
                }
                Op::Drop(i) => {
                    owners[i] = None;
                }
            }

            prop_assert!(registry.is_consistent());
            let names = registry.identifiers();
            let unique: HashSet<_> = names.iter().collect();
            prop_assert_eq!(unique.len(), names.len());
            for name in &names {
                prop_assert!(registry.contains(name));
            }
        }
    }
}
