//! Merge timeout filtering.

use anyhow::Result;
use chrono::{TimeDelta, Utc};
use covmerge::cache::ResultSetEntry;
use covmerge::test_utils::fixtures::result_aged;
use covmerge::test_utils::{CoverageFixture, TestEnvironment};
use std::time::Duration;

#[test]
fn test_stale_result_excluded_but_kept_on_disk() -> Result<()> {
    let env = TestEnvironment::new()?;
    let merger = env.merger();
    let now = Utc::now();

    merger.store_result(&result_aged("old", 700, now))?;
    merger.store_result(&result_aged("recent", 30, now))?;

    let merged = merger.merged_result(now, Duration::from_secs(600))?;
    assert_eq!(merged.command_name, "recent");

    let set = env.store().resultset()?;
    assert!(set.contains("old"));
    assert!(set.contains("recent"));
    Ok(())
}

#[test]
fn test_timeout_boundary_is_exclusive() -> Result<()> {
    let env = TestEnvironment::new()?;
    let merger = env.merger();
    let now = Utc::now();

    merger.store_result(&result_aged("edge", 600, now))?;
    merger.store_result(&result_aged("inside", 599, now))?;

    let names: Vec<_> = merger
        .results(now, Duration::from_secs(600))?
        .into_iter()
        .map(|r| r.command_name)
        .collect();
    assert_eq!(names, vec!["inside"]);
    Ok(())
}

#[test]
fn test_future_timestamp_counts_as_fresh() -> Result<()> {
    let env = TestEnvironment::new()?;
    let now = Utc::now();

    env.merger().store_result(&result_aged("skewed", -120, now))?;

    let merged = env.merger().merged_result(now, Duration::from_secs(600))?;
    assert_eq!(merged.command_name, "skewed");
    Ok(())
}

#[test]
fn test_all_stale_merges_to_empty() -> Result<()> {
    let env = TestEnvironment::new()?;
    let now = Utc::now();

    env.merger().store_result(&result_aged("a", 3600, now))?;
    env.merger().store_result(&result_aged("b", 7200, now))?;

    let merged = env.merger().merged_result(now, Duration::from_secs(600))?;
    assert_eq!(merged.command_name, "");
    assert!(merged.coverage.is_empty());
    Ok(())
}

#[test]
fn test_stale_entry_survives_other_writes() -> Result<()> {
    let env = TestEnvironment::new()?;
    let now = Utc::now();
    let store = env.store();

    let old = ResultSetEntry {
        coverage: CoverageFixture::basic().build(),
        created_at: now - TimeDelta::days(2),
    };
    assert!(store.update(|set| set.upsert("nightly", old.clone()))?.ran());

    env.merger().store_result(&result_aged("unit", 0, now))?;

    assert_eq!(store.resultset()?.get("nightly"), Some(&old));
    Ok(())
}
