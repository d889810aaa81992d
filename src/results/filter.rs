//! Filter engine: row visibility and best-cell selection.
//!
//! [`FilterState`] is a plain value handed to the query for each render, so
//! every rule here can be exercised without a presentation layer.

use super::aggregate::{AggregatedRow, AggregationIndex, Cell};
use super::flatten::FacetOptions;
use super::timestamp::END_OF_DAY_SECS;
use super::winners::TiePolicy;
use crate::error::FilterError;
use crate::models::DEFAULT_CONTEXT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Slack applied to both ends of a size range, in billions of parameters.
pub const SIZE_EPSILON: f64 = 1e-6;

/// What an empty inclusion set means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySelection {
    /// Nothing passes a facet with no selected values
    #[default]
    MatchNothing,
    /// A facet with no selected values does not restrict anything
    MatchAll,
}

impl EmptySelection {
    /// Check `value` against an inclusion set under this policy.
    pub fn admits(self, set: &BTreeSet<String>, value: &str) -> bool {
        if set.is_empty() {
            return self == EmptySelection::MatchAll;
        }
        set.contains(value)
    }
}

/// Inclusive parameter-count range in billions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    pub lo: f64,
    pub hi: f64,
}

impl SizeRange {
    pub fn new(lo: f64, hi: f64) -> Result<Self, FilterError> {
        if !(lo <= hi) {
            return Err(FilterError::InvalidSizeRange { lo, hi });
        }
        Ok(SizeRange { lo, hi })
    }

    pub fn contains(&self, size: f64) -> bool {
        size >= self.lo - SIZE_EPSILON && size <= self.hi + SIZE_EPSILON
    }
}

/// Run date range in Unix seconds.
///
/// `start` is inclusive; `end` names a day and admits anything before
/// `end + 86400`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl DateRange {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Result<Self, FilterError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(FilterError::InvalidDateRange { start, end });
            }
        }
        Ok(DateRange { start, end })
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Runs without a timestamp never fall inside an active range.
    pub fn contains(&self, ts: Option<i64>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(ts) = ts else {
            return false;
        };
        if let Some(start) = self.start {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if ts >= end.saturating_add(END_OF_DAY_SECS) {
                return false;
            }
        }
        true
    }
}

/// Every facet selection that shapes one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub models: BTreeSet<String>,
    pub quants: BTreeSet<String>,
    pub kernels: BTreeSet<String>,
    pub firmwares: BTreeSet<String>,
    pub runs: BTreeSet<String>,
    /// Active backends in column order
    pub backends: Vec<String>,
    pub size_range: Option<SizeRange>,
    pub date_range: Option<DateRange>,
    pub context: String,
    pub group_by_kernel: bool,
    pub group_by_firmware: bool,
    pub empty_selection: EmptySelection,
    pub tie_policy: TiePolicy,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            models: BTreeSet::new(),
            quants: BTreeSet::new(),
            kernels: BTreeSet::new(),
            firmwares: BTreeSet::new(),
            runs: BTreeSet::new(),
            backends: Vec::new(),
            size_range: None,
            date_range: None,
            context: DEFAULT_CONTEXT.to_string(),
            group_by_kernel: false,
            group_by_firmware: false,
            empty_selection: EmptySelection::default(),
            tie_policy: TiePolicy::default(),
        }
    }
}

impl FilterState {
    /// Everything selected: all facet values, all backends, first context.
    pub fn permissive(facets: &FacetOptions, index: &AggregationIndex) -> Self {
        FilterState {
            models: facets.models.clone(),
            quants: facets.quants.clone(),
            kernels: facets.kernels.clone(),
            firmwares: facets.firmwares.clone(),
            runs: facets.runs.clone(),
            backends: index.envs().iter().cloned().collect(),
            context: index.first_context().unwrap_or(DEFAULT_CONTEXT).to_string(),
            ..FilterState::default()
        }
    }

    pub fn grouping_enabled(&self) -> bool {
        self.group_by_kernel || self.group_by_firmware
    }

    /// Backend columns for this render, in order.
    pub fn active_backends<'a>(&'a self, index: &'a AggregationIndex) -> Vec<&'a str> {
        if self.backends.is_empty() && self.empty_selection == EmptySelection::MatchAll {
            return index.envs().iter().map(String::as_str).collect();
        }
        self.backends.iter().map(String::as_str).collect()
    }

    /// Row-level checks: model, quant and size.
    ///
    /// A row without a quant label or a size is not restricted by that facet.
    pub fn row_visible(&self, row: &AggregatedRow) -> bool {
        let policy = self.empty_selection;
        if !policy.admits(&self.models, &row.model) {
            return false;
        }
        if let Some(quant) = &row.quant {
            if !policy.admits(&self.quants, quant) {
                return false;
            }
        }
        if let (Some(range), Some(size)) = (&self.size_range, row.size_b) {
            if !range.contains(size) {
                return false;
            }
        }
        true
    }

    /// Cell-level checks: run, kernel, firmware and date.
    pub fn cell_passes(&self, cell: &Cell) -> bool {
        let policy = self.empty_selection;
        if !policy.admits(&self.runs, &cell.run_id) {
            return false;
        }
        if let Some(kernel) = cell.kernel() {
            if !policy.admits(&self.kernels, kernel) {
                return false;
            }
        }
        if let Some(firmware) = cell.firmware() {
            if !policy.admits(&self.firmwares, firmware) {
                return false;
            }
        }
        match &self.date_range {
            Some(range) => range.contains(cell.run_timestamp),
            None => true,
        }
    }
}

/// Best cell for one backend among already-filtered cells.
///
/// Picks the greatest usable mean. Cells with no mean (or flagged as errors)
/// are only returned when nothing numeric exists for that backend, so the
/// error stays visible. Ties keep the first cell.
pub fn best_cell<'a, I>(cells: I, env: &str) -> Option<&'a Cell>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut best: Option<&'a Cell> = None;
    for cell in cells.into_iter().filter(|c| c.env == env) {
        best = match best {
            None => Some(cell),
            Some(current) => match (current.usable_mean(), cell.usable_mean()) {
                (None, Some(_)) => Some(cell),
                (Some(a), Some(b)) if b > a => Some(cell),
                _ => Some(current),
            },
        };
    }
    best
}
