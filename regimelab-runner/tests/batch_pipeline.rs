//! Integration tests: synthetic table through batch, selection, dataset and
//! export, then reading the artifacts back.

use regimelab_core::data::{synthetic_table, PriceTable, SyntheticConfig};
use regimelab_runner::{
    build_dataset, load_manifest, run_batch, save_outputs, select_best, PipelineConfig,
    SCHEMA_VERSION,
};

fn table() -> PriceTable {
    synthetic_table(
        6,
        &SyntheticConfig {
            days: 400,
            seed: 7,
            ..SyntheticConfig::default()
        },
    )
}

fn config() -> PipelineConfig {
    PipelineConfig::from_toml(
        r#"
        [regime]
        trend_window = 20
        min_duration = 5

        [selection]
        filter_recent = false
        "#,
    )
    .unwrap()
}

#[test]
fn full_pipeline_writes_all_tables() {
    let table = table();
    let config = config();
    let batch = run_batch(&table, &config).unwrap();
    let best = select_best(&batch, &config.selection);
    let dataset = build_dataset(&table, &batch, &config.features);

    let dir = tempfile::tempdir().unwrap();
    let manifest = save_outputs(dir.path(), &batch, &best, Some(&dataset), &config).unwrap();

    for name in [
        "runs.csv",
        "labels.csv",
        "ev_results.csv",
        "best.csv",
        "durations.csv",
        "dataset.csv",
        "manifest.json",
    ] {
        assert!(dir.path().join(name).exists(), "missing {name}");
    }
    assert_eq!(manifest.instrument_count, 6);
    assert_eq!(manifest.config_fingerprint, config.fingerprint().unwrap());

    let loaded = load_manifest(dir.path()).unwrap();
    assert_eq!(loaded, manifest);
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);

    let labels = std::fs::read_to_string(dir.path().join("labels.csv")).unwrap();
    assert_eq!(labels.lines().count(), 1 + 6 * 400);
    let ev = std::fs::read_to_string(dir.path().join("ev_results.csv")).unwrap();
    assert_eq!(ev.lines().count(), 1 + 6 * 3);
}

#[test]
fn best_table_is_ranked_and_unique() {
    let table = table();
    let config = config();
    let batch = run_batch(&table, &config).unwrap();
    let best = select_best(&batch, &config.selection);

    for pair in best.windows(2) {
        assert!(pair[0].ev_with_costs >= pair[1].ev_with_costs);
    }
    let mut names: Vec<&str> = best.iter().map(|b| b.instrument.as_str()).collect();
    names.dedup();
    assert_eq!(names.len(), best.len());
    assert!(best.iter().all(|b| b.trade_count > 0));
}

#[test]
fn recency_filter_only_narrows() {
    let table = table();
    let mut config = config();
    let batch = run_batch(&table, &config).unwrap();
    let all = select_best(&batch, &config.selection);

    config.selection.filter_recent = true;
    config.selection.recency_days = 0;
    let recent = select_best(&batch, &config.selection);
    assert!(recent.len() <= all.len());
    assert!(recent
        .iter()
        .all(|b| b.days_since_last_run == Some(0)));
}

#[test]
fn batch_is_deterministic() {
    let table = table();
    let config = config();
    assert_eq!(
        run_batch(&table, &config).unwrap(),
        run_batch(&table, &config).unwrap()
    );
}
