//! Results and settings file loading.

use crate::error::{ConfigError, DataError};
use crate::models::{ResultsData, Run};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the global settings path: ~/.config/bench-browser/settings.json
pub fn get_global_settings_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine home directory".to_string())
    })?;

    let config_dir = home.join(".config/bench-browser");
    Ok(config_dir.join("settings.json"))
}

/// Ensure the parent directory of `path` exists
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }
    }
    Ok(())
}

/// Validate a JSON file path (.json extension required).
pub fn validate_json_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => {}
        Some(ext) => {
            return Err(ConfigError::ValidationFailed(format!(
                "File must have .json extension, got .{}",
                ext.to_string_lossy()
            )))
        }
        None => {
            return Err(ConfigError::ValidationFailed(
                "File must have .json extension".to_string(),
            ))
        }
    }

    Ok(())
}

/// Load a results file from disk.
pub fn load_results_from_file(path: &Path) -> Result<ResultsData, DataError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DataError::FileNotFound(path.display().to_string())
        } else {
            DataError::IoError(e)
        }
    })?;

    let data = parse_results(&content)?;
    log::info!(
        "[Loader] Loaded {} runs ({} measurements) from {}",
        data.runs.len(),
        data.measurement_count(),
        path.display()
    );
    Ok(data)
}

/// Parse results JSON.
///
/// Accepted shapes:
/// - `[run, ...]`
/// - `{"schema_version": "...", "runs": [run, ...]}`
/// - `{"schema_version": "...", "runs": {"<run_id>": run, ...}}`
pub fn parse_results(content: &str) -> Result<ResultsData, DataError> {
    let root: Value = serde_json::from_str(content)?;
    results_from_value(root)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build [`ResultsData`] from an already-parsed JSON root.
pub fn results_from_value(root: Value) -> Result<ResultsData, DataError> {
    let (schema_version, runs_value) = match root {
        Value::Array(items) => (None, Value::Array(items)),
        Value::Object(mut map) => {
            let schema_version = map
                .get("schema_version")
                .and_then(Value::as_str)
                .map(str::to_string);
            match map.remove("runs") {
                Some(runs) => (schema_version, runs),
                None => {
                    return Err(DataError::InvalidRoot(
                        "object has no 'runs' field".to_string(),
                    ))
                }
            }
        }
        other => {
            return Err(DataError::InvalidRoot(format!(
                "expected an array of runs, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut runs = BTreeMap::new();
    match runs_value {
        Value::Array(items) => {
            for (position, item) in items.into_iter().enumerate() {
                insert_run(&mut runs, None, item, position);
            }
        }
        Value::Object(map) => {
            for (position, (key, item)) in map.into_iter().enumerate() {
                insert_run(&mut runs, Some(key), item, position);
            }
        }
        other => {
            return Err(DataError::InvalidRoot(format!(
                "'runs' must be an array or object, got {}",
                json_kind(&other)
            )))
        }
    }

    Ok(ResultsData {
        schema_version,
        runs,
    })
}

fn insert_run(runs: &mut BTreeMap<String, Run>, key: Option<String>, item: Value, position: usize) {
    if !item.is_object() {
        log::warn!(
            "[Loader] Skipping run #{}: expected an object, got {}",
            position,
            json_kind(&item)
        );
        return;
    }
    let mut run: Run = match serde_json::from_value(item) {
        Ok(run) => run,
        Err(e) => {
            log::warn!("[Loader] Skipping run #{}: {}", position, e);
            return;
        }
    };

    if run.run_id.trim().is_empty() {
        match key {
            Some(key) if !key.trim().is_empty() => run.run_id = key,
            _ => {
                log::warn!("[Loader] Skipping run #{}: no run_id", position);
                return;
            }
        }
    }

    if let Some(previous) = runs.insert(run.run_id.clone(), run) {
        log::warn!(
            "[Loader] Duplicate run_id {}, keeping the later record",
            previous.run_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_array_root() {
        let data = parse_results(
            r#"[{"run_id": "1_1700000000", "benchmarks": [{"model": "m", "env": "rocm", "test": "pp512"}]}]"#,
        )
        .unwrap();
        assert_eq!(data.runs.len(), 1);
        assert_eq!(data.measurement_count(), 1);
        assert_eq!(data.schema_version, None);
    }

    #[test]
    fn test_parse_keyed_runs_object() {
        let data = parse_results(
            r#"{"schema_version": "1.0", "runs": {
                "12345_1700000000": {"system_info": {"kernel": "6.6.1"}, "benchmarks": []},
                "12346_1700000100": {"run_id": "12346_1700000100", "benchmarks": []}
            }}"#,
        )
        .unwrap();
        assert_eq!(data.schema_version.as_deref(), Some("1.0"));
        assert_eq!(data.runs["12345_1700000000"].run_id, "12345_1700000000");
        assert_eq!(data.runs["12345_1700000000"].system_info.kernel(), Some("6.6.1"));
    }

    #[test]
    fn test_invalid_roots() {
        for content in ["null", "42", "\"runs\"", r#"{"schema_version": "1.0"}"#, r#"{"runs": 3}"#] {
            let result = parse_results(content);
            assert!(
                matches!(result, Err(DataError::InvalidRoot(_))),
                "expected InvalidRoot for {}",
                content
            );
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_results("{ nope"), Err(DataError::InvalidJson(_))));
    }

    #[test]
    fn test_runs_without_id_skipped() {
        let data = parse_results(
            r#"[{"benchmarks": []}, 7, {"run_id": "2_1700000000", "benchmarks": []}]"#,
        )
        .unwrap();
        assert_eq!(data.runs.keys().collect::<Vec<_>>(), vec!["2_1700000000"]);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(br#"{"runs": [{"run_id": "a_1700000000"}]}"#)
            .unwrap();

        let data = load_results_from_file(&path).unwrap();
        assert!(data.runs.contains_key("a_1700000000"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_results_from_file(Path::new("/nonexistent/results.json"));
        assert!(matches!(result, Err(DataError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_json_path() {
        assert!(validate_json_path(Path::new("settings.json")).is_ok());
        assert!(validate_json_path(Path::new("settings.toml")).is_err());
        assert!(validate_json_path(Path::new("settings")).is_err());
        assert!(validate_json_path(Path::new("")).is_err());
    }
}
