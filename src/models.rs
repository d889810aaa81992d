//! Core data types for benchmark result files.
//!
//! These mirror the JSON written by the benchmark harness. Every field is
//! optional and leniently typed: a value of the wrong JSON type is read as
//! "no value" instead of failing the whole file, because result files are
//! merged from many harness versions.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Context key used when a measurement does not name one.
pub const DEFAULT_CONTEXT: &str = "default";

/// Row and facet name for measurements that carry no model name.
pub const UNKNOWN_MODEL: &str = "unknown";

/// Read any JSON value and keep it only if it converts to `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
}

/// Keep the object entries of a list, skip everything else.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Treat empty and whitespace-only strings as absent.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Machine metadata captured alongside a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    #[serde(deserialize_with = "lenient")]
    pub hostname: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub kernel: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub linux_firmware: Option<String>,
    /// Display timestamp as written by the harness (free-form)
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    /// Any other keys the harness recorded (CPU, GPU, driver versions, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SystemInfo {
    /// Kernel version, if reported and non-blank
    pub fn kernel(&self) -> Option<&str> {
        non_blank(&self.kernel)
    }

    /// linux-firmware version, if reported and non-blank
    pub fn firmware(&self) -> Option<&str> {
        non_blank(&self.linux_firmware)
    }

    pub fn hostname(&self) -> Option<&str> {
        non_blank(&self.hostname)
    }
}

/// Model file fingerprint ("hash:size:mtime" expanded by the harness).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFingerprint {
    #[serde(deserialize_with = "lenient")]
    pub partial_hash: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub size_bytes: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub mtime_unix: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub mtime_iso: Option<String>,
}

/// A llama.cpp build identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlamacppBuild {
    #[serde(deserialize_with = "lenient")]
    pub hash: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub number: Option<String>,
}

/// Container the benchmark executed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxInfo {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub container_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub created_iso: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub llamacpp_build: Option<LlamacppBuild>,
}

/// One benchmark result: a (model, backend, test, context) throughput sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurement {
    #[serde(deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub model_clean: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub quant: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub env: Option<String>,
    /// Harness bookkeeping, carried through for `data()` consumers only
    #[serde(deserialize_with = "lenient")]
    pub env_base: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub env_variant: Option<String>,
    /// Flash attention enabled
    #[serde(deserialize_with = "lenient_bool")]
    pub fa: bool,
    #[serde(deserialize_with = "lenient")]
    pub test: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub context: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub context_tokens: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub tps_mean: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub tps_std: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub error: bool,
    #[serde(deserialize_with = "lenient")]
    pub error_type: Option<String>,
    /// Dual-server (RPC) execution
    #[serde(deserialize_with = "lenient_bool")]
    pub rpc: bool,
    #[serde(deserialize_with = "lenient")]
    pub params_b: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub name_params_b: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub file_size_gib: Option<f64>,
    /// Model file fingerprint, copied onto cells for detail views
    #[serde(deserialize_with = "lenient")]
    pub model_id: Option<ModelFingerprint>,
    #[serde(deserialize_with = "lenient")]
    pub toolbox: Option<ToolboxInfo>,
}

impl Measurement {
    /// Display name used for grouping: `model_clean` when present, else `model`.
    pub fn display_model(&self) -> Option<&str> {
        non_blank(&self.model_clean).or_else(|| non_blank(&self.model))
    }

    /// Row key and facet value: [`display_model`](Self::display_model) or [`UNKNOWN_MODEL`].
    pub fn model_key(&self) -> &str {
        self.display_model().unwrap_or(UNKNOWN_MODEL)
    }

    /// Backend identifier, if present.
    pub fn env(&self) -> Option<&str> {
        non_blank(&self.env)
    }

    /// Test label as written (e.g. "pp512").
    pub fn test(&self) -> Option<&str> {
        non_blank(&self.test)
    }

    /// Quantization label normalized to upper case.
    pub fn quant_key(&self) -> Option<String> {
        non_blank(&self.quant).map(str::to_uppercase)
    }

    /// Context key, falling back to [`DEFAULT_CONTEXT`].
    pub fn context_key(&self) -> &str {
        non_blank(&self.context).unwrap_or(DEFAULT_CONTEXT)
    }

    /// Parameter count in billions: `name_params_b` first, then `params_b`.
    pub fn size_b(&self) -> Option<f64> {
        self.name_params_b
            .filter(|v| v.is_finite())
            .or(self.params_b.filter(|v| v.is_finite()))
    }

    /// True when aggregation can place this measurement (has `env` and `test`).
    pub fn is_complete(&self) -> bool {
        self.env().is_some() && self.test().is_some()
    }
}

/// One execution of the benchmark harness on one machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Run {
    #[serde(deserialize_with = "lenient_string")]
    pub run_id: String,
    #[serde(deserialize_with = "lenient_system_info")]
    pub system_info: SystemInfo,
    #[serde(deserialize_with = "lenient_list")]
    pub benchmarks: Vec<Measurement>,
    // Harness bookkeeping below is kept verbatim and never queried
    #[serde(deserialize_with = "lenient")]
    pub generated_at: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub llamacpp_builds: Vec<LlamacppBuild>,
    #[serde(deserialize_with = "lenient_list")]
    pub environments: Vec<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, String>(deserializer)?.unwrap_or_default())
}

fn lenient_system_info<'de, D>(deserializer: D) -> Result<SystemInfo, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, SystemInfo>(deserializer)?.unwrap_or_default())
}

/// A loaded results file: runs keyed by run id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsData {
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub runs: BTreeMap<String, Run>,
}

impl ResultsData {
    /// Total number of measurements across all runs
    pub fn measurement_count(&self) -> usize {
        self.runs.values().map(|r| r.benchmarks.len()).sum()
    }
}
