//! Integration tests for ResultsBrowser, results loading and persisted settings.

use bench_browser::error::{DataError, FilterError};
use bench_browser::{
    BrowserSettings, EmptySelection, Facet, ResultsBrowser, SettingsManager, TiePolicy,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PRODUCER_FILE: &str = r#"{
    "schema_version": "1.0",
    "runs": {
        "20001_1731000000": {
            "system_info": {
                "hostname": "framework-desktop",
                "kernel": "6.11.5",
                "linux_firmware": "20241017",
                "timestamp": "2024-11-07T17:20:00Z"
            },
            "benchmarks": [
                {"model": "Llama-2-7B.Q4_K_M", "model_clean": "Llama-2-7B", "quant": "q4_k_m",
                 "env": "rocm6.4.4", "test": "pp512", "tps_mean": 1021.4, "tps_std": 4.1,
                 "params_b": 6.74, "fa": true, "file_size_gib": 3.8},
                {"model_clean": "Llama-2-7B", "quant": "Q4_K_M", "env": "vulkan_radv",
                 "test": "pp512", "tps_mean": 880.0, "tps_std": 2.0, "params_b": 6.74},
                {"model_clean": "Llama-2-7B", "quant": "Q4_K_M", "env": "rocm6.4.4",
                 "test": "tg128", "tps_mean": 48.2, "tps_std": 0.1},
                {"model_clean": "Llama-2-7B", "quant": "Q4_K_M", "env": "vulkan_radv",
                 "test": "tg128", "tps_mean": 48.3, "tps_std": 0.05},
                {"model_clean": "Llama-2-7B", "quant": "Q4_K_M", "env": "rocm6.4.4",
                 "test": "pp512", "context": "longctx32768", "tps_mean": 410.0, "tps_std": 3.0}
            ]
        },
        "20002_1733600000": {
            "system_info": {"hostname": "framework-desktop", "kernel": "6.12.1"},
            "benchmarks": [
                {"model_clean": "Qwen3-30B-A3B", "quant": "Q8_0", "env": "vulkan_radv",
                 "test": "pp512", "tps_mean": "n/a", "error": true, "error_type": "load_failed",
                 "params_b": 30.53, "rpc": true}
            ]
        }
    }
}"#;

fn write_results(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("results_new.json");
    fs::write(&path, PRODUCER_FILE).unwrap();
    path
}

fn load(dir: &TempDir) -> ResultsBrowser {
    ResultsBrowser::from_file(&write_results(dir)).expect("results load")
}

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_from_file_builds_facets_and_contexts() {
    let temp_dir = TempDir::new().unwrap();
    let browser = load(&temp_dir);

    let facets = browser.facets();
    assert_eq!(
        facets.models.iter().collect::<Vec<_>>(),
        vec!["Llama-2-7B", "Qwen3-30B-A3B"]
    );
    assert!(facets.quants.contains("Q4_K_M"));
    assert!(facets.kernels.contains("6.12.1"));
    assert_eq!(facets.firmwares.len(), 1);

    let contexts: Vec<_> = browser.contexts().iter().map(|c| c.label()).collect();
    assert_eq!(contexts, vec!["Default", "32768 tokens"]);

    assert_eq!(browser.backend_order(), &["rocm6.4.4".to_string(), "vulkan_radv".to_string()]);
    let sizes = browser.size_bounds().unwrap();
    assert_eq!((sizes.min, sizes.max), (6.74, 30.53));
}

#[test]
fn test_missing_results_file() {
    let result = ResultsBrowser::from_file(&PathBuf::from("/nonexistent/results_new.json"));
    assert!(matches!(result, Err(DataError::FileNotFound(_))));
}

#[test]
fn test_malformed_results_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("results.json");
    fs::write(&path, "\"just a string\"").unwrap();
    assert!(matches!(
        ResultsBrowser::from_file(&path),
        Err(DataError::InvalidRoot(_))
    ));
}

// ============================================================================
// RENDERING
// ============================================================================

#[test]
fn test_render_sections_and_details() {
    let temp_dir = TempDir::new().unwrap();
    let browser = load(&temp_dir);
    let output = browser.render();

    assert_eq!(
        output.sections.iter().map(|s| s.test.as_str()).collect::<Vec<_>>(),
        vec!["pp512", "tg128"]
    );

    let pp = output.section("pp512").unwrap();
    let llama = &pp.rows[0];
    assert_eq!(llama.model, "Llama-2-7B");
    assert_eq!(llama.quant.as_deref(), Some("Q4_K_M"));
    assert_eq!(llama.winners, vec!["rocm6.4.4"]);
    let rocm = llama.cell("rocm6.4.4").unwrap();
    assert!(rocm.fa);
    assert_eq!(rocm.file_size_gib, Some(3.8));

    let qwen = &pp.rows[1];
    assert!(qwen.rpc);
    assert!(qwen.winners.is_empty());
    assert!(qwen.cell("vulkan_radv").unwrap().error);

    // 48.3 vs 48.2 with tiny stds falls inside the 0.25 floor
    let tg = output.section("tg128").unwrap();
    assert_eq!(tg.rows[0].winners, vec!["rocm6.4.4", "vulkan_radv"]);
}

#[test]
fn test_switch_context() {
    let temp_dir = TempDir::new().unwrap();
    let mut browser = load(&temp_dir);
    browser.set_context("longctx32768").unwrap();

    let output = browser.render();
    assert_eq!(output.context, "longctx32768");
    assert_eq!(output.row_count(), 1);
    assert_eq!(
        output.sections[0].rows[0].cell("rocm6.4.4").and_then(|c| c.mean),
        Some(410.0)
    );

    assert!(matches!(
        browser.set_context("longctx999"),
        Err(FilterError::UnknownContext(_))
    ));
    assert_eq!(browser.filter().context, "longctx32768");
}

#[test]
fn test_quant_toggle_hides_rows() {
    let temp_dir = TempDir::new().unwrap();
    let mut browser = load(&temp_dir);
    assert!(!browser.toggle_value(Facet::Quant, "Q8_0"));

    let output = browser.render();
    let models: Vec<_> = output.sections[0].rows.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(models, vec!["Llama-2-7B"]);
}

#[test]
fn test_run_labels() {
    let temp_dir = TempDir::new().unwrap();
    let browser = load(&temp_dir);
    assert_eq!(
        browser.run_label("20001_1731000000"),
        "20001_1731000000 · framework-desktop · 2024-11-07"
    );
}

#[test]
fn test_move_backend_reorders_columns() {
    let temp_dir = TempDir::new().unwrap();
    let mut browser = load(&temp_dir);
    browser.move_backend(0, 1).unwrap();
    assert_eq!(browser.render().backends, vec!["vulkan_radv", "rocm6.4.4"]);
}

// ============================================================================
// SETTINGS
// ============================================================================

#[test]
fn test_settings_round_trip_through_browser() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("config/settings.json");
    let mut browser = load(&temp_dir);

    browser.set_backend_visible("rocm6.4.4", false).unwrap();
    browser.set_group_by_kernel(true);
    browser.set_empty_selection(EmptySelection::MatchAll);
    browser.set_context("longctx32768").unwrap();
    browser.set_tie_policy(TiePolicy {
        floor: 1.0,
        sigma_multiplier: 2.0,
    });

    let saved = browser.to_settings(&BrowserSettings::default());
    SettingsManager::save_to(&saved, &settings_path).unwrap();
    let loaded = SettingsManager::load_from(&settings_path).unwrap();
    assert_eq!(loaded, saved);

    let mut fresh = load(&temp_dir);
    fresh.apply_settings(&loaded);
    assert_eq!(fresh.filter().backends, vec!["vulkan_radv"]);
    assert!(fresh.filter().group_by_kernel);
    assert_eq!(fresh.filter().empty_selection, EmptySelection::MatchAll);
    assert_eq!(fresh.filter().context, "longctx32768");
    assert_eq!(fresh.filter().tie_policy.floor, 1.0);
}

#[test]
fn test_stale_settings_fall_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.json");
    fs::write(&settings_path, r#"{"tie_policy": {"floor": -3}}"#).unwrap();

    let loaded = SettingsManager::load_from(&settings_path).unwrap();
    assert_eq!(loaded, BrowserSettings::default());
}

#[test]
fn test_reload_keeps_view() {
    let temp_dir = TempDir::new().unwrap();
    let mut browser = load(&temp_dir);
    browser.set_context("longctx32768").unwrap();
    browser.move_backend(0, 1).unwrap();

    let data = bench_browser::config::loader::parse_results(PRODUCER_FILE).unwrap();
    browser.replace_runs(data);
    assert_eq!(browser.filter().context, "longctx32768");
    assert_eq!(browser.backend_order()[0], "vulkan_radv");
}
