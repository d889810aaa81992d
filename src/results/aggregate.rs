//! Aggregation index: context → test → model → row.
//!
//! Folds flattened measurements into one [`AggregatedRow`] per
//! (context, test, model), each holding a cell per (backend, run). The index
//! is rebuilt only when the run set changes and is read-only afterwards.

use super::flatten::{flatten_runs, FlatEntry};
use crate::models::{ModelFingerprint, Run, SystemInfo, ToolboxInfo, DEFAULT_CONTEXT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

static LONGCTX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)longctx(\d+)").expect("longctx pattern is a valid regex")
});

/// Identity of a cell within a row: one backend on one run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub env: String,
    pub run_id: String,
}

impl CellKey {
    pub fn new(env: impl Into<String>, run_id: impl Into<String>) -> Self {
        CellKey {
            env: env.into(),
            run_id: run_id.into(),
        }
    }
}

/// One measurement projected for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub env: String,
    pub run_id: String,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub error: bool,
    pub error_type: Option<String>,
    /// Timestamp derived from `run_id`
    pub run_timestamp: Option<i64>,
    pub fa: bool,
    pub file_size_gib: Option<f64>,
    pub toolbox: Option<ToolboxInfo>,
    pub model_id: Option<ModelFingerprint>,
    pub system_info: Arc<SystemInfo>,
}

impl Cell {
    pub fn key(&self) -> CellKey {
        CellKey::new(self.env.clone(), self.run_id.clone())
    }

    /// Numeric mean of a non-error cell; the only cells that can win.
    pub fn usable_mean(&self) -> Option<f64> {
        if self.error {
            return None;
        }
        self.mean.filter(|m| m.is_finite())
    }

    pub fn kernel(&self) -> Option<&str> {
        self.system_info.kernel()
    }

    pub fn firmware(&self) -> Option<&str> {
        self.system_info.firmware()
    }
}

/// One model under one test in one context.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub model: String,
    /// First-seen quantization label (upper case)
    pub quant: Option<String>,
    /// First numeric parameter count seen, in billions
    pub size_b: Option<f64>,
    /// True if any contributing measurement ran in RPC mode
    pub rpc: bool,
    pub cells: BTreeMap<CellKey, Cell>,
}

impl AggregatedRow {
    fn new(model: &str) -> Self {
        AggregatedRow {
            model: model.to_string(),
            quant: None,
            size_b: None,
            rpc: false,
            cells: BTreeMap::new(),
        }
    }
}

/// All rows for one test within a context.
#[derive(Debug, Clone, PartialEq)]
pub struct TestGroup {
    /// First-seen casing of the test name
    pub label: String,
    pub rows: BTreeMap<String, AggregatedRow>,
}

/// A context-window configuration and everything measured under it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub key: String,
    /// Token count supplied by the data, if any
    pub tokens: Option<u64>,
    pub tests: BTreeMap<String, TestGroup>,
}

impl ContextEntry {
    fn new(key: &str, tokens: Option<u64>) -> Self {
        ContextEntry {
            key: key.to_string(),
            tokens,
            tests: BTreeMap::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.key == DEFAULT_CONTEXT
    }

    /// Token count from the data, or parsed from a `longctx<N>` key.
    pub fn effective_tokens(&self) -> Option<u64> {
        self.tokens.or_else(|| {
            LONGCTX_RE
                .captures(&self.key)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }

    /// Display label for a context selector.
    pub fn label(&self) -> String {
        if self.is_default() {
            return "Default".to_string();
        }
        match self.effective_tokens() {
            Some(tokens) => format!("{} tokens", tokens),
            None => self.key.clone(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.tests.values().map(|t| t.rows.len()).sum()
    }
}

/// Default context first, then ascending token count, then key.
fn compare_contexts(a: &ContextEntry, b: &ContextEntry) -> Ordering {
    match (a.is_default(), b.is_default()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    match (a.effective_tokens(), b.effective_tokens()) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.key.cmp(&b.key)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.key.cmp(&b.key),
    }
}

/// Inclusive min/max tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    fn extend(bounds: &mut Option<Self>, value: T) {
        match bounds {
            Some(b) => {
                if value < b.min {
                    b.min = value;
                }
                if value > b.max {
                    b.max = value;
                }
            }
            None => *bounds = Some(Bounds { min: value, max: value }),
        }
    }
}

/// Nested, queryable view of all measurements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationIndex {
    contexts: BTreeMap<String, ContextEntry>,
    envs: BTreeSet<String>,
    size_bounds: Option<Bounds<f64>>,
    date_bounds: Option<Bounds<i64>>,
    skipped: usize,
    overwritten: usize,
}

impl AggregationIndex {
    /// Flatten and aggregate a run set in one go.
    pub fn from_runs(runs: &BTreeMap<String, Run>) -> Self {
        let flattened = flatten_runs(runs);
        Self::build(&flattened.entries)
    }

    /// Fold flattened entries into the index.
    pub fn build(entries: &[FlatEntry<'_>]) -> Self {
        let mut index = AggregationIndex::default();
        // One shared copy of each run's system info for all its cells
        let mut systems: HashMap<&str, Arc<SystemInfo>> = HashMap::new();

        for entry in entries {
            let m = entry.measurement;
            let (Some(test), Some(env)) = (m.test(), m.env()) else {
                index.skipped += 1;
                continue;
            };

            let context_key = m.context_key();
            let context = index
                .contexts
                .entry(context_key.to_string())
                .or_insert_with(|| ContextEntry::new(context_key, m.context_tokens));
            if context.tokens.is_none() && m.context_tokens.is_some() {
                context.tokens = m.context_tokens;
            }

            let group = context
                .tests
                .entry(test.to_lowercase())
                .or_insert_with(|| TestGroup {
                    label: test.to_string(),
                    rows: BTreeMap::new(),
                });

            let model = m.model_key();
            let row = group
                .rows
                .entry(model.to_string())
                .or_insert_with(|| AggregatedRow::new(model));

            if row.quant.is_none() {
                row.quant = m.quant_key();
            }
            if row.size_b.is_none() {
                if let Some(size) = m.size_b() {
                    row.size_b = Some(size);
                    Bounds::extend(&mut index.size_bounds, size);
                }
            }
            row.rpc |= m.rpc;

            let system_info = systems
                .entry(entry.run_id)
                .or_insert_with(|| Arc::new(entry.system_info.clone()))
                .clone();
            let cell = Cell {
                env: env.to_string(),
                run_id: entry.run_id.to_string(),
                mean: m.tps_mean,
                std: m.tps_std,
                error: m.error,
                error_type: m.error_type.clone(),
                run_timestamp: entry.run_timestamp,
                fa: m.fa,
                file_size_gib: m.file_size_gib,
                toolbox: m.toolbox.clone(),
                model_id: m.model_id.clone(),
                system_info,
            };
            if let Some(previous) = row.cells.insert(cell.key(), cell) {
                index.overwritten += 1;
                log::debug!(
                    "[Index] Duplicate cell {}/{} for {} in {}/{} (last write wins)",
                    previous.env,
                    previous.run_id,
                    model,
                    context_key,
                    test
                );
            }

            index.envs.insert(env.to_string());
            if let Some(ts) = entry.run_timestamp {
                Bounds::extend(&mut index.date_bounds, ts);
            }
        }

        log::info!(
            "[Index] Built {} contexts, {} rows, {} backends ({} measurements dropped, {} overwritten)",
            index.contexts.len(),
            index.contexts.values().map(ContextEntry::row_count).sum::<usize>(),
            index.envs.len(),
            index.skipped,
            index.overwritten
        );
        index
    }

    /// Contexts in display order.
    pub fn contexts(&self) -> Vec<&ContextEntry> {
        let mut contexts: Vec<_> = self.contexts.values().collect();
        contexts.sort_by(|a, b| compare_contexts(a, b));
        contexts
    }

    pub fn context(&self, key: &str) -> Option<&ContextEntry> {
        self.contexts.get(key)
    }

    /// Key of the first context in display order.
    pub fn first_context(&self) -> Option<&str> {
        self.contexts().into_iter().next().map(|c| c.key.as_str())
    }

    /// Every backend seen, sorted; seeds the column order.
    pub fn envs(&self) -> &BTreeSet<String> {
        &self.envs
    }

    pub fn size_bounds(&self) -> Option<Bounds<f64>> {
        self.size_bounds
    }

    pub fn date_bounds(&self) -> Option<Bounds<i64>> {
        self.date_bounds
    }

    /// Measurements dropped for lacking `env` or `test`.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Cells replaced by a later measurement with the same backend and run.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
