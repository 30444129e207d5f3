//! Integration test: seed determinism and conservation under random
//! parameters.
//!
//! For arbitrary seeds and epidemic parameters, two engines built from
//! the same blueprint must produce identical reports, a reset engine must
//! replay its own run, and the hospital population must balance on every
//! tick.

use std::sync::Arc;

use cohort_engine::{Blueprint, TickEngine};
use cohort_test_utils::{hospital_config, sir_config, FrequencyDependentInfection, HOSPITAL};
use proptest::prelude::*;

const ALIVE: [cohort_core::CompartmentId; 5] = [
    HOSPITAL::S,
    HOSPITAL::I,
    HOSPITAL::WARD,
    HOSPITAL::R,
    HOSPITAL::Q,
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn same_seed_same_report(seed in any::<u64>(), beta in 0.0f64..1.5, gamma in 0.05f64..1.0) {
        let blueprint = Arc::new(Blueprint::new(sir_config(480, 20, beta, gamma)).unwrap());
        let policy = FrequencyDependentInfection::sir(beta);
        let a = TickEngine::new(Arc::clone(&blueprint), seed).run(&policy);
        let b = TickEngine::new(Arc::clone(&blueprint), seed).run(&policy);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn reset_engine_replays_its_run(seed in any::<u64>(), other in any::<u64>()) {
        let blueprint = Arc::new(Blueprint::new(hospital_config(3_000, 10, 2.0)).unwrap());
        let policy = FrequencyDependentInfection::hospital(0.5);
        let mut engine = TickEngine::new(blueprint, seed);
        let first = engine.run(&policy);
        engine.reset(other);
        engine.run(&policy);
        engine.reset(seed);
        let again = engine.run(&policy);
        prop_assert_eq!(first, again);
    }

    #[test]
    fn hospital_population_balances(
        seed in any::<u64>(),
        beta in 0.1f64..1.2,
        beds in 0.0f64..20.0,
    ) {
        let blueprint = Arc::new(Blueprint::new(hospital_config(4_000, 20, beds)).unwrap());
        let policy = FrequencyDependentInfection::hospital(beta);
        let report = TickEngine::new(blueprint, seed).run(&policy);
        let t = &report.trajectory;
        let mut removed = 0;
        for k in 0..t.len() {
            removed += t.new_members(HOSPITAL::TURNED_AWAY)[k];
            let alive: u64 = ALIVE
                .iter()
                .map(|&id| t.sizes(id)[k])
                .sum();
            prop_assert_eq!(alive + removed, 4_000);
            prop_assert_eq!(t.sizes(HOSPITAL::ADMISSION)[k], 0);
        }
    }
}
