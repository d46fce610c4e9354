use proptest::prelude::*;
use std::sync::Arc;
use stipend_distribution::memory::{InMemoryTokenLedger, ManualClock, StaticOracle, StaticVerifier};
use stipend_distribution::{
    AccountId, Amount, Collaborators, DistributionEngine, DistributionError, EngineParams,
    EnrollmentData, RegionCode, MAX_PER_BENEFICIARY, MIN_ROUND_INTERVAL,
};

// Property-based tests for quota accounting and exactly-once payouts
// Random payout sequences must never push a bounded region past its cap

#[derive(Debug, Clone)]
enum Step {
    Pay { who: u8, amount: Amount },
    NewRound,
}

fn arbitrary_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        8 => (0u8..12, 1u128..=2_000).prop_map(|(who, amount)| Step::Pay { who, amount }),
        1 => Just(Step::NewRound),
    ]
}

struct Fixture {
    engine: DistributionEngine,
    ledger: Arc<InMemoryTokenLedger>,
    clock: Arc<ManualClock>,
    admin: AccountId,
    people: Vec<AccountId>,
}

fn region() -> RegionCode {
    RegionCode::new("R1").unwrap()
}

fn fixture(cap: Amount) -> Fixture {
    let admin = AccountId::derive("admin");
    let ledger = Arc::new(InMemoryTokenLedger::new().with_balance(admin, u64::MAX as Amount));
    let verifier = Arc::new(StaticVerifier::new());
    let oracle = Arc::new(StaticOracle::new());
    oracle.set_eligible(region(), true);
    let clock = Arc::new(ManualClock::new(0));

    let people: Vec<AccountId> = (0..12)
        .map(|i| {
            let who = AccountId::derive(&format!("person-{i}"));
            verifier.enroll(who, EnrollmentData::new(0, region(), "ngo"));
            who
        })
        .collect();

    let engine = DistributionEngine::new(
        admin,
        EngineParams::default(),
        Collaborators::new(ledger.clone(), verifier, oracle, clock.clone()),
    );
    engine.add_allowed_region(&admin, region()).unwrap();
    engine.set_regional_cap(&admin, region(), cap).unwrap();

    Fixture {
        engine,
        ledger,
        clock,
        admin,
        people,
    }
}

proptest! {
    #[test]
    fn regional_usage_never_exceeds_cap(
        cap in 1u128..=10_000,
        steps in prop::collection::vec(arbitrary_step(), 1..60),
    ) {
        let f = fixture(cap);

        for step in steps {
            match step {
                Step::Pay { who, amount } => {
                    let _ = f.engine.distribute(&f.admin, &f.people[who as usize], amount);
                }
                Step::NewRound => {
                    f.clock.advance(MIN_ROUND_INTERVAL + 1);
                    prop_assert!(f.engine.start_new_round(&f.admin).is_ok());
                }
            }

            let entry = f.engine.regional_cap(&region()).unwrap();
            prop_assert!(entry.used <= entry.cap);
            prop_assert_eq!(entry.used, f.engine.round_total(f.engine.current_round()));
        }
    }
}

proptest! {
    #[test]
    fn each_beneficiary_is_paid_at_most_once_per_round(
        attempts in prop::collection::vec((0u8..12, 1u128..=MAX_PER_BENEFICIARY), 1..40),
    ) {
        let f = fixture(0);
        let mut paid = std::collections::HashSet::new();

        for (who, amount) in attempts {
            let beneficiary = f.people[who as usize];
            match f.engine.distribute(&f.admin, &beneficiary, amount) {
                Ok(()) => prop_assert!(paid.insert(who)),
                Err(DistributionError::AlreadyDistributed { round, .. }) => {
                    prop_assert_eq!(round, 1);
                    prop_assert!(paid.contains(&who));
                }
                Err(other) => prop_assert!(false, "unexpected error {}", other),
            }
        }

        let stats = f.engine.statistics();
        prop_assert_eq!(stats.total_payouts as usize, paid.len());
        prop_assert_eq!(f.ledger.call_count(), paid.len());
    }
}

proptest! {
    #[test]
    fn log_total_matches_recipient_balances(
        amounts in prop::collection::vec(1u128..=MAX_PER_BENEFICIARY, 1..12),
    ) {
        let f = fixture(0);
        for (i, amount) in amounts.iter().enumerate() {
            prop_assert!(f.engine.distribute(&f.admin, &f.people[i], *amount).is_ok());
        }

        let received: Amount = f.people.iter().map(|p| f.ledger.balance_of(p)).sum();
        prop_assert_eq!(f.engine.statistics().total_distributed, received);
        prop_assert_eq!(f.engine.distribution_log(amounts.len() as u64).map(|e| e.id), Some(amounts.len() as u64));
    }
}
