//! Held, abandoned, and contended lock markers.

use anyhow::Result;
use chrono::Utc;
use covmerge::MergeError;
use covmerge::constants::LOCK_ATTEMPTS;
use covmerge::test_utils::{CoverageFixture, TestEnvironment};
use std::fs::{self, File};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

#[test]
fn test_held_lock_skips_store_after_full_budget() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.merger().store_result(&CoverageFixture::basic().result("unit", Utc::now()))?;
    let before = env.read_resultset()?;
    let marker = env.plant_lock_marker()?;

    let started = Instant::now();
    let stored = env
        .merger()
        .store_result(&CoverageFixture::basic().result("integration", Utc::now()))?;
    let elapsed = started.elapsed();

    assert!(!stored);
    assert!(elapsed >= Duration::from_secs(u64::from(LOCK_ATTEMPTS)));
    assert_eq!(env.read_resultset()?, before);
    // Another process's marker is left alone
    assert!(marker.exists());
    Ok(())
}

#[test]
fn test_held_lock_strict_store_reports_exhaustion() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.plant_lock_marker()?;

    let err = env
        .merger_with_budget(3, Duration::from_millis(10))
        .store_result_strict(&CoverageFixture::basic().result("unit", Utc::now()))
        .unwrap_err();

    match err.downcast_ref::<MergeError>() {
        Some(MergeError::LockExhausted { path, attempts }) => {
            assert_eq!(path, &env.lock_path());
            assert_eq!(*attempts, 3);
        }
        other => panic!("expected LockExhausted, got {other:?}"),
    }
    assert!(!env.resultset_exists());
    Ok(())
}

#[test]
fn test_held_lock_reads_as_empty() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.merger().store_result(&CoverageFixture::basic().result("unit", Utc::now()))?;
    env.plant_lock_marker()?;

    let merged = env.merger_with_budget(2, Duration::from_millis(10)).merged_result_now()?;
    assert_eq!(merged.command_name, "");
    Ok(())
}

#[test]
fn test_lock_released_by_holder_mid_budget() -> Result<()> {
    let env = TestEnvironment::new()?;
    let marker = env.plant_lock_marker()?;

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        fs::remove_file(marker)
    });

    let stored = env
        .merger_with_budget(20, Duration::from_millis(50))
        .store_result(&CoverageFixture::basic().result("unit", Utc::now()))?;
    releaser.join().expect("releaser thread")?;

    assert!(stored);
    assert!(env.store().resultset()?.contains("unit"));
    Ok(())
}

#[test]
fn test_abandoned_marker_is_reclaimed() -> Result<()> {
    let env = TestEnvironment::new()?;
    let marker = env.plant_lock_marker()?;
    let long_ago = SystemTime::now() - Duration::from_secs(3600);
    File::options().write(true).open(&marker)?.set_modified(long_ago)?;

    let stored = env
        .merger_with_budget(1, Duration::from_millis(10))
        .store_result(&CoverageFixture::basic().result("unit", Utc::now()))?;

    assert!(stored);
    assert!(!marker.exists());
    Ok(())
}

#[test]
fn test_concurrent_stores_lose_no_updates() -> Result<()> {
    let env = Arc::new(TestEnvironment::new()?);
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));
    let now = Utc::now();

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let env = Arc::clone(&env);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<bool> {
                let merger = env.merger_with_budget(400, Duration::from_millis(5));
                let result = CoverageFixture::new()
                    .uniform("shared.rs", 4, 1)
                    .result(&format!("worker-{i}"), now);
                barrier.wait();
                merger.store_result(&result)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("worker thread")?);
    }

    let set = env.store().resultset()?;
    assert_eq!(set.len(), workers);
    for i in 0..workers {
        assert!(set.contains(&format!("worker-{i}")));
    }

    let merged = env.merger().merged_result(now, env.config().merge_timeout)?;
    assert_eq!(merged.coverage.file("shared.rs").unwrap(), &vec![Some(workers as u64); 4]);
    assert!(!env.lock_path().exists());
    Ok(())
}
