//! ResultsBrowser: owner of the loaded runs, the index and the filter state.
//!
//! The presentation layer calls the mutation entry points below in response
//! to user input and then calls [`ResultsBrowser::render`]. The index is
//! rebuilt only when the run set changes; each render borrows the current
//! filter state immutably.

use crate::config::BrowserSettings;
use crate::error::{DataError, FilterError};
use crate::models::{ResultsData, Run};
use crate::results::{
    flatten_runs, render, timestamp, AggregationIndex, Bounds, ContextEntry, DateRange,
    EmptySelection, FacetOptions, FilterState, RenderOutput, SizeRange, TiePolicy,
};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Inclusion-set facets selectable by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Model,
    Quant,
    Kernel,
    Firmware,
    Run,
}

impl Facet {
    pub const ALL: [Facet; 5] = [
        Facet::Model,
        Facet::Quant,
        Facet::Kernel,
        Facet::Firmware,
        Facet::Run,
    ];

    fn options(self, facets: &FacetOptions) -> &BTreeSet<String> {
        match self {
            Facet::Model => &facets.models,
            Facet::Quant => &facets.quants,
            Facet::Kernel => &facets.kernels,
            Facet::Firmware => &facets.firmwares,
            Facet::Run => &facets.runs,
        }
    }

    fn selection(self, filter: &FilterState) -> &BTreeSet<String> {
        match self {
            Facet::Model => &filter.models,
            Facet::Quant => &filter.quants,
            Facet::Kernel => &filter.kernels,
            Facet::Firmware => &filter.firmwares,
            Facet::Run => &filter.runs,
        }
    }

    fn selection_mut(self, filter: &mut FilterState) -> &mut BTreeSet<String> {
        match self {
            Facet::Model => &mut filter.models,
            Facet::Quant => &mut filter.quants,
            Facet::Kernel => &mut filter.kernels,
            Facet::Firmware => &mut filter.firmwares,
            Facet::Run => &mut filter.runs,
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Model => write!(f, "model"),
            Facet::Quant => write!(f, "quant"),
            Facet::Kernel => write!(f, "kernel"),
            Facet::Firmware => write!(f, "firmware"),
            Facet::Run => write!(f, "run"),
        }
    }
}

/// Loaded results plus the current view.
#[derive(Debug, Clone)]
pub struct ResultsBrowser {
    data: ResultsData,
    facets: FacetOptions,
    index: AggregationIndex,
    filter: FilterState,
    /// Every known backend in column order, hidden ones included
    backend_order: Vec<String>,
    hidden_backends: BTreeSet<String>,
}

impl ResultsBrowser {
    /// Index `data` and select every facet value.
    pub fn new(data: ResultsData) -> Self {
        let flattened = flatten_runs(&data.runs);
        let facets = flattened.facets.clone();
        let index = AggregationIndex::build(&flattened.entries);
        let filter = FilterState::permissive(&facets, &index);
        let backend_order = index.envs().iter().cloned().collect();
        drop(flattened);

        log::info!(
            "[Browser] Indexed {} runs: {} models, {} backends, {} contexts",
            data.runs.len(),
            facets.models.len(),
            index.envs().len(),
            index.contexts().len()
        );

        ResultsBrowser {
            data,
            facets,
            index,
            filter,
            backend_order,
            hidden_backends: BTreeSet::new(),
        }
    }

    /// Load and index a results file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let data = crate::config::loader::load_results_from_file(path)?;
        Ok(Self::new(data))
    }

    /// Swap in a new run set and rebuild the index.
    ///
    /// Existing selections are kept; facet values that did not exist before
    /// are selected, values that disappeared are dropped. The context falls
    /// back to the first one if it no longer exists.
    pub fn replace_runs(&mut self, data: ResultsData) {
        let flattened = flatten_runs(&data.runs);
        let facets = flattened.facets.clone();
        let index = AggregationIndex::build(&flattened.entries);
        drop(flattened);

        for facet in Facet::ALL {
            let old_options = facet.options(&self.facets).clone();
            let new_options = facet.options(&facets);
            let selection = facet.selection_mut(&mut self.filter);
            selection.retain(|v| new_options.contains(v));
            selection.extend(
                new_options
                    .iter()
                    .filter(|v| !old_options.contains(*v))
                    .cloned(),
            );
        }

        self.backend_order.retain(|env| index.envs().contains(env));
        for env in index.envs() {
            if !self.backend_order.contains(env) {
                self.backend_order.push(env.clone());
            }
        }
        self.hidden_backends.retain(|env| index.envs().contains(env));

        if index.context(&self.filter.context).is_none() {
            self.filter.context = index
                .first_context()
                .unwrap_or(crate::models::DEFAULT_CONTEXT)
                .to_string();
        }

        self.data = data;
        self.facets = facets;
        self.index = index;
        self.sync_backends();
        log::info!("[Browser] Reloaded {} runs", self.data.runs.len());
    }

    /// Apply persisted view settings.
    ///
    /// Unknown backends and contexts named in the settings are ignored.
    pub fn apply_settings(&mut self, settings: &BrowserSettings) {
        self.filter.empty_selection = settings.empty_selection;
        self.filter.tie_policy = settings.tie_policy;
        self.filter.group_by_kernel = settings.group_by_kernel;
        self.filter.group_by_firmware = settings.group_by_firmware;
        self.set_backend_order(&settings.backend_order);
        self.hidden_backends = settings
            .hidden_backends
            .iter()
            .filter(|env| self.index.envs().contains(*env))
            .cloned()
            .collect();
        self.sync_backends();

        if let Some(context) = &settings.default_context {
            if let Err(e) = self.set_context(context) {
                log::warn!("[Browser] Ignoring saved context: {}", e);
            }
        }
    }

    /// Capture the current view as settings (results/log paths left as given).
    pub fn to_settings(&self, base: &BrowserSettings) -> BrowserSettings {
        BrowserSettings {
            default_context: Some(self.filter.context.clone()),
            empty_selection: self.filter.empty_selection,
            backend_order: self.backend_order.clone(),
            hidden_backends: self.hidden_backends.iter().cloned().collect(),
            group_by_kernel: self.filter.group_by_kernel,
            group_by_firmware: self.filter.group_by_firmware,
            tie_policy: self.filter.tie_policy,
            ..base.clone()
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Recompute the visible table for the current filter state.
    pub fn render(&self) -> RenderOutput {
        render(&self.index, &self.filter)
    }

    pub fn data(&self) -> &ResultsData {
        &self.data
    }

    pub fn index(&self) -> &AggregationIndex {
        &self.index
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Sorted option lists for the filter widgets.
    pub fn facets(&self) -> &FacetOptions {
        &self.facets
    }

    pub fn selection(&self, facet: Facet) -> &BTreeSet<String> {
        facet.selection(&self.filter)
    }

    /// All backends in column order, hidden ones included.
    pub fn backend_order(&self) -> &[String] {
        &self.backend_order
    }

    pub fn is_backend_visible(&self, env: &str) -> bool {
        self.filter.backends.iter().any(|b| b == env)
    }

    /// Contexts in selector order.
    pub fn contexts(&self) -> Vec<&ContextEntry> {
        self.index.contexts()
    }

    /// Range for the size slider.
    pub fn size_bounds(&self) -> Option<Bounds<f64>> {
        self.index.size_bounds()
    }

    /// Range for the date picker.
    pub fn date_bounds(&self) -> Option<Bounds<i64>> {
        self.index.date_bounds()
    }

    /// Human label for a run option: id, hostname and date when known.
    pub fn run_label(&self, run_id: &str) -> String {
        let mut parts = vec![run_id.to_string()];
        if let Some(run) = self.find_run(run_id) {
            if let Some(host) = run.system_info.hostname() {
                parts.push(host.to_string());
            }
        }
        if let Some(date) = timestamp::run_timestamp(run_id).and_then(timestamp::format_date) {
            parts.push(date);
        }
        parts.join(" · ")
    }

    /// Run whose effective id (inner `run_id`, else its map key) is `run_id`.
    fn find_run(&self, run_id: &str) -> Option<&Run> {
        self.data
            .runs
            .iter()
            .find(|(key, run)| {
                let id = if run.run_id.is_empty() { key.as_str() } else { run.run_id.as_str() };
                id == run_id
            })
            .map(|(_, run)| run)
    }

    // ------------------------------------------------------------------
    // Facet selections
    // ------------------------------------------------------------------

    /// Replace a facet's selection.
    pub fn set_selection<I, S>(&mut self, facet: Facet, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selection = facet.selection_mut(&mut self.filter);
        *selection = values.into_iter().map(Into::into).collect();
        log::debug!("[Browser] {} selection: {} values", facet, selection.len());
    }

    /// Flip one value; returns whether it is now selected.
    pub fn toggle_value(&mut self, facet: Facet, value: &str) -> bool {
        let selection = facet.selection_mut(&mut self.filter);
        if selection.remove(value) {
            false
        } else {
            selection.insert(value.to_string());
            true
        }
    }

    pub fn select_all(&mut self, facet: Facet) {
        let all = facet.options(&self.facets).clone();
        *facet.selection_mut(&mut self.filter) = all;
    }

    pub fn clear_selection(&mut self, facet: Facet) {
        facet.selection_mut(&mut self.filter).clear();
    }

    pub fn set_empty_selection(&mut self, policy: EmptySelection) {
        self.filter.empty_selection = policy;
    }

    // ------------------------------------------------------------------
    // Ranges, context, grouping
    // ------------------------------------------------------------------

    pub fn set_size_range(&mut self, lo: f64, hi: f64) -> Result<(), FilterError> {
        self.filter.size_range = Some(SizeRange::new(lo, hi)?);
        Ok(())
    }

    pub fn clear_size_range(&mut self) {
        self.filter.size_range = None;
    }

    /// Set the run date range in Unix seconds; `end` names the last included day.
    pub fn set_date_range(&mut self, start: Option<i64>, end: Option<i64>) -> Result<(), FilterError> {
        let range = DateRange::new(start, end)?;
        self.filter.date_range = range.is_active().then_some(range);
        Ok(())
    }

    pub fn clear_date_range(&mut self) {
        self.filter.date_range = None;
    }

    pub fn set_context(&mut self, key: &str) -> Result<(), FilterError> {
        if self.index.context(key).is_none() {
            return Err(FilterError::UnknownContext(key.to_string()));
        }
        self.filter.context = key.to_string();
        Ok(())
    }

    pub fn set_group_by_kernel(&mut self, enabled: bool) {
        self.filter.group_by_kernel = enabled;
    }

    pub fn set_group_by_firmware(&mut self, enabled: bool) {
        self.filter.group_by_firmware = enabled;
    }

    pub fn set_tie_policy(&mut self, policy: TiePolicy) {
        self.filter.tie_policy = policy;
    }

    // ------------------------------------------------------------------
    // Backend columns
    // ------------------------------------------------------------------

    /// Show or hide a backend column.
    pub fn set_backend_visible(&mut self, env: &str, visible: bool) -> Result<(), FilterError> {
        if !self.index.envs().contains(env) {
            return Err(FilterError::UnknownBackend(env.to_string()));
        }
        if visible {
            self.hidden_backends.remove(env);
        } else {
            self.hidden_backends.insert(env.to_string());
        }
        self.sync_backends();
        Ok(())
    }

    /// Move the backend at `from` to position `to` (drag-reorder).
    pub fn move_backend(&mut self, from: usize, to: usize) -> Result<(), FilterError> {
        let len = self.backend_order.len();
        for index in [from, to] {
            if index >= len {
                return Err(FilterError::PositionOutOfRange { index, len });
            }
        }
        let env = self.backend_order.remove(from);
        self.backend_order.insert(to, env);
        self.sync_backends();
        Ok(())
    }

    /// Put the named backends first, in the given order; the rest follow sorted.
    pub fn set_backend_order(&mut self, preferred: &[String]) {
        let mut order: Vec<String> = Vec::with_capacity(self.index.envs().len());
        for env in preferred {
            if self.index.envs().contains(env) && !order.contains(env) {
                order.push(env.clone());
            }
        }
        for env in self.index.envs() {
            if !order.contains(env) {
                order.push(env.clone());
            }
        }
        self.backend_order = order;
        self.sync_backends();
    }

    fn sync_backends(&mut self) {
        self.filter.backends = self
            .backend_order
            .iter()
            .filter(|env| !self.hidden_backends.contains(*env))
            .cloned()
            .collect();
    }
}
