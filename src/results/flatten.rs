//! Run flattening and facet collection.
//!
//! Turns the run-id → run mapping into one entry per measurement, each
//! annotated with its parent run's id, system info and derived timestamp.

use super::timestamp::run_timestamp;
use crate::models::{Measurement, Run, SystemInfo};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One measurement with its run metadata merged in.
#[derive(Debug, Clone, Copy)]
pub struct FlatEntry<'a> {
    pub run_id: &'a str,
    pub system_info: &'a SystemInfo,
    pub run_timestamp: Option<i64>,
    pub measurement: &'a Measurement,
}

/// Distinct values for each filterable facet, sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetOptions {
    pub models: BTreeSet<String>,
    pub quants: BTreeSet<String>,
    pub kernels: BTreeSet<String>,
    pub firmwares: BTreeSet<String>,
    pub runs: BTreeSet<String>,
}

impl FacetOptions {
    fn record(&mut self, entry: &FlatEntry<'_>) {
        let m = entry.measurement;
        self.models.insert(m.model_key().to_string());
        if let Some(quant) = m.quant_key() {
            self.quants.insert(quant);
        }
        if let Some(kernel) = entry.system_info.kernel() {
            self.kernels.insert(kernel.to_string());
        }
        if let Some(firmware) = entry.system_info.firmware() {
            self.firmwares.insert(firmware.to_string());
        }
        self.runs.insert(entry.run_id.to_string());
    }
}

/// Output of [`flatten_runs`].
#[derive(Debug, Clone, Default)]
pub struct Flattened<'a> {
    pub entries: Vec<FlatEntry<'a>>,
    pub facets: FacetOptions,
}

/// Flatten runs into per-measurement entries and collect facet values.
///
/// Runs are visited in key order and measurements in stored order. No entry
/// is dropped here; facets only see entries that carry both `env` and `test`,
/// since aggregation drops the rest.
pub fn flatten_runs(runs: &BTreeMap<String, Run>) -> Flattened<'_> {
    let mut flattened = Flattened::default();

    for (key, run) in runs {
        let run_id = if run.run_id.is_empty() {
            key.as_str()
        } else {
            run.run_id.as_str()
        };
        let ts = run_timestamp(run_id);

        for measurement in &run.benchmarks {
            let entry = FlatEntry {
                run_id,
                system_info: &run.system_info,
                run_timestamp: ts,
                measurement,
            };
            if measurement.is_complete() {
                flattened.facets.record(&entry);
            }
            flattened.entries.push(entry);
        }
    }

    log::debug!(
        "[Flatten] {} runs -> {} entries ({} models, {} quants)",
        runs.len(),
        flattened.entries.len(),
        flattened.facets.models.len(),
        flattened.facets.quants.len()
    );
    flattened
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(model: &str, env: Option<&str>, test: Option<&str>) -> Measurement {
        Measurement {
            model: Some(model.to_string()),
            env: env.map(str::to_string),
            test: test.map(str::to_string),
            quant: Some("q8_0".to_string()),
            ..Default::default()
        }
    }

    fn run(id: &str, kernel: &str, benchmarks: Vec<Measurement>) -> Run {
        Run {
            run_id: id.to_string(),
            system_info: SystemInfo {
                kernel: Some(kernel.to_string()),
                linux_firmware: Some("20250109".to_string()),
                ..Default::default()
            },
            benchmarks,
            ..Default::default()
        }
    }

    #[test]
    fn test_keeps_every_entry_in_order() {
        let mut runs = BTreeMap::new();
        runs.insert(
            "b_1700000100".to_string(),
            run(
                "b_1700000100",
                "6.6.1",
                vec![
                    measurement("m2", Some("vulkan"), Some("pp512")),
                    measurement("m3", None, Some("pp512")),
                ],
            ),
        );
        runs.insert(
            "a_1700000000".to_string(),
            run("a_1700000000", "6.5.0", vec![measurement("m1", Some("rocm"), Some("tg128"))]),
        );

        let flat = flatten_runs(&runs);
        let order: Vec<_> = flat
            .entries
            .iter()
            .map(|e| e.measurement.model.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(order, vec!["m1", "m2", "m3"]);
        assert_eq!(flat.entries[0].run_timestamp, Some(1_700_000_000));
        assert_eq!(flat.entries[2].run_id, "b_1700000100");
    }

    #[test]
    fn test_incomplete_entries_do_not_feed_facets() {
        let mut runs = BTreeMap::new();
        runs.insert(
            "r_1700000000".to_string(),
            run(
                "r_1700000000",
                "6.6.1",
                vec![
                    measurement("kept", Some("rocm"), Some("pp512")),
                    measurement("no-env", None, Some("pp512")),
                    measurement("no-test", Some("rocm"), None),
                ],
            ),
        );

        let flat = flatten_runs(&runs);
        assert_eq!(flat.entries.len(), 3);
        assert_eq!(
            flat.facets.models.iter().collect::<Vec<_>>(),
            vec!["kept"]
        );
        assert!(flat.facets.quants.contains("Q8_0"));
        assert!(flat.facets.kernels.contains("6.6.1"));
        assert!(flat.facets.firmwares.contains("20250109"));
    }

    #[test]
    fn test_run_id_falls_back_to_key() {
        let mut runs = BTreeMap::new();
        let mut r = run("", "6.6.1", vec![measurement("m", Some("rocm"), Some("pp512"))]);
        r.run_id.clear();
        runs.insert("7_1700000000".to_string(), r);

        let flat = flatten_runs(&runs);
        assert_eq!(flat.entries[0].run_id, "7_1700000000");
        assert!(flat.facets.runs.contains("7_1700000000"));
    }
}
