//! Storing results from several runs and merging them.

use anyhow::Result;
use chrono::Utc;
use covmerge::test_utils::fixtures::result_aged;
use covmerge::test_utils::{CoverageFixture, TestEnvironment};
use covmerge::{CoverageResult, Merger, ResultSetStore};

#[test]
fn test_two_suites_merge_in_store_order() -> Result<()> {
    let env = TestEnvironment::new()?;
    let now = Utc::now();

    let unit = CoverageFixture::new()
        .file("lib/parser.rs", vec![Some(1), None, Some(0)])
        .result("unit", now);
    let integration = CoverageFixture::new()
        .file("lib/parser.rs", vec![Some(2), None, Some(5)])
        .file("lib/cli.rs", vec![Some(1)])
        .result("integration", now);

    // Each suite writes through its own merger, like separate processes
    assert!(env.merger().store_result(&unit)?);
    assert!(env.merger().store_result(&integration)?);

    let merged = env.merger().merged_result(now, env.config().merge_timeout)?;
    assert_eq!(merged.command_name, "unit, integration");
    assert_eq!(merged.created_at, now);
    assert_eq!(merged.coverage.file("lib/parser.rs").unwrap(), &vec![Some(3), None, Some(5)]);
    assert_eq!(merged.coverage.file("lib/cli.rs").unwrap(), &vec![Some(1)]);
    Ok(())
}

#[test]
fn test_rerun_replaces_previous_result() -> Result<()> {
    let env = TestEnvironment::new()?;
    let merger = env.merger();
    let now = Utc::now();

    merger.store_result(&CoverageFixture::new().uniform("a.rs", 2, 1).result("unit", now))?;
    merger.store_result(&CoverageFixture::new().uniform("b.rs", 2, 1).result("other", now))?;
    merger.store_result(&CoverageFixture::new().uniform("a.rs", 2, 7).result("unit", now))?;

    let set = env.store().resultset()?;
    assert_eq!(set.len(), 2);
    assert_eq!(set.command_names().collect::<Vec<_>>(), vec!["unit", "other"]);

    let merged = merger.merged_result_now()?;
    assert_eq!(merged.coverage.file("a.rs").unwrap(), &vec![Some(7), Some(7)]);
    Ok(())
}

#[test]
fn test_storing_same_result_twice_is_idempotent() -> Result<()> {
    let env = TestEnvironment::new()?;
    let merger = env.merger();
    let result = CoverageFixture::basic().result("unit", Utc::now());

    merger.store_result(&result)?;
    let first = env.read_resultset()?;
    merger.store_result(&result)?;

    assert_eq!(env.read_resultset()?, first);
    Ok(())
}

#[test]
fn test_stored_result_round_trips_exactly() -> Result<()> {
    let env = TestEnvironment::new()?;
    let result = CoverageFixture::basic().result("unit", Utc::now());

    env.merger().store_result(&result)?;

    let loaded = env.merger().results_now()?;
    assert_eq!(loaded, vec![result]);
    Ok(())
}

#[test]
fn test_nothing_stored_merges_to_empty_result() -> Result<()> {
    let env = TestEnvironment::new()?;

    let merged = env.merger().merged_result_now()?;
    assert_eq!(merged.command_name, "");
    assert!(merged.coverage.is_empty());
    // Merging alone never creates the cache file
    assert!(!env.resultset_exists());
    Ok(())
}

#[test]
fn test_coverage_directory_created_on_first_store() -> Result<()> {
    let env = TestEnvironment::new()?;
    assert!(!env.coverage_dir.exists());

    env.merger().store_result(&CoverageFixture::basic().result("unit", Utc::now()))?;

    assert!(env.resultset_exists());
    assert!(!env.lock_path().exists());
    Ok(())
}

#[test]
fn test_store_and_merger_agree_on_paths() -> Result<()> {
    let env = TestEnvironment::new()?;
    let merger = Merger::new(&env.config());
    let store = ResultSetStore::new(&env.coverage_dir);

    assert_eq!(merger.store().resultset_path(), store.resultset_path());
    assert_eq!(merger.store().resultset_path(), env.resultset_path());
    assert!(env.resultset_path().starts_with(env.root()));
    Ok(())
}

#[test]
fn test_results_from_many_suites_accumulate() -> Result<()> {
    let env = TestEnvironment::new()?;
    let now = Utc::now();

    let names = ["unit", "integration", "system", "e2e"];
    for name in names {
        let result = CoverageResult::with_created_at(
            name,
            CoverageFixture::new().uniform("shared.rs", 3, 1).build(),
            now,
        );
        assert!(env.merger().store_result(&result)?);
    }

    let merged = env.merger().merged_result(now, env.config().merge_timeout)?;
    assert_eq!(merged.command_name, names.join(", "));
    assert_eq!(merged.coverage.file("shared.rs").unwrap(), &vec![Some(4); 3]);
    Ok(())
}

#[test]
fn test_aged_out_suite_drops_from_merged_name() -> Result<()> {
    let env = TestEnvironment::new()?;
    let merger = env.merger();
    let now = Utc::now();
    let max_age = std::time::Duration::from_secs(600);

    merger.store_result(&result_aged("unit", 0, now))?;
    merger.store_result(&result_aged("integration", 0, now))?;
    assert_eq!(merger.merged_result(now, max_age)?.command_name, "unit, integration");

    merger.store_result(&result_aged("unit", 700, now))?;
    assert_eq!(merger.merged_result(now, max_age)?.command_name, "integration");
    Ok(())
}
