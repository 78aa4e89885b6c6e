//! Heavy write contention on one result set.

use anyhow::Result;
use chrono::Utc;
use covmerge::test_utils::{CoverageFixture, TestEnvironment, init_test_logging};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

fn run_workers(
    env: &Arc<TestEnvironment>,
    workers: usize,
    rounds: usize,
    budget: (u32, Duration),
) -> Vec<(String, bool)> {
    let barrier = Arc::new(Barrier::new(workers));
    let now = Utc::now();

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let env = Arc::clone(env);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<Vec<(String, bool)>> {
                let merger = env.merger_with_budget(budget.0, budget.1);
                barrier.wait();
                let mut outcomes = Vec::with_capacity(rounds);
                for round in 0..rounds {
                    let name = format!("worker-{i}-round-{round}");
                    let result =
                        CoverageFixture::basic().uniform("shared.rs", 8, 1).result(&name, now);
                    let stored = merger.store_result(&result)?;
                    outcomes.push((name, stored));
                }
                Ok(outcomes)
            })
        })
        .collect();

    handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("worker thread").expect("worker result"))
        .collect()
}

/// 32 writers with a generous budget: every result must land.
#[test]
fn test_stress_32_writers_all_stored() -> Result<()> {
    init_test_logging(None);
    let env = Arc::new(TestEnvironment::new()?);

    let start = Instant::now();
    let outcomes = run_workers(&env, 32, 4, (10_000, Duration::from_millis(2)));
    let elapsed = start.elapsed();
    println!("32 writers x 4 rounds stored in {elapsed:?}");

    assert!(outcomes.iter().all(|(_, stored)| *stored));

    let set = env.store().resultset()?;
    assert_eq!(set.len(), outcomes.len());
    for (name, _) in &outcomes {
        assert!(set.contains(name), "{name} missing from result set");
    }

    let merged = env.merger().merged_result_now()?;
    assert_eq!(merged.coverage.file("shared.rs").unwrap(), &vec![Some(outcomes.len() as u64); 8]);
    assert!(!env.lock_path().exists());
    Ok(())
}

/// A tight budget drops some writes, but never corrupts the file and never
/// reports a dropped write as stored.
#[test]
fn test_stress_tight_budget_is_consistent() -> Result<()> {
    init_test_logging(None);
    let env = Arc::new(TestEnvironment::new()?);

    let outcomes = run_workers(&env, 16, 3, (2, Duration::from_millis(1)));
    let stored = outcomes.iter().filter(|(_, stored)| *stored).count();
    println!("{stored}/{} writes stored under a 2-attempt budget", outcomes.len());
    debug!(stored, total = outcomes.len(), "Tight budget run finished");

    let set = env.store().resultset()?;
    for (name, was_stored) in &outcomes {
        assert_eq!(set.contains(name), *was_stored, "{name} stored={was_stored}");
    }
    assert_eq!(set.len(), stored);
    assert!(!env.lock_path().exists());
    Ok(())
}
