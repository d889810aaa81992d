//! The render query: index + filter state → ordered, resolved table.

use super::aggregate::{AggregationIndex, Cell};
use super::grouping::{expand_row, RowView};
use super::filter::FilterState;
use super::winners::resolve_winners;
use serde::Serialize;

/// One backend column of a rendered row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendCell {
    pub env: String,
    /// Best matching cell; `None` renders as an empty placeholder
    pub cell: Option<Cell>,
    pub winner: bool,
}

/// A visible row with its per-backend cells resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub model: String,
    pub quant: Option<String>,
    pub size_b: Option<f64>,
    pub rpc: bool,
    /// Kernel label when grouping by kernel
    pub kernel_group: Option<String>,
    /// Firmware label when grouping by firmware
    pub firmware_group: Option<String>,
    pub cells: Vec<BackendCell>,
    pub winners: Vec<String>,
}

impl RenderedRow {
    pub fn cell(&self, env: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|c| c.env == env)
            .and_then(|c| c.cell.as_ref())
    }
}

/// All visible rows of one test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSection {
    pub test: String,
    pub label: String,
    pub rows: Vec<RenderedRow>,
}

/// Result of one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub context: String,
    pub backends: Vec<String>,
    pub sections: Vec<TestSection>,
}

impl RenderOutput {
    /// No visible rows: the "no data" state, distinct from a load failure.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }

    pub fn section(&self, test: &str) -> Option<&TestSection> {
        self.sections.iter().find(|s| s.test == test)
    }
}

fn resolve_view(view: &RowView<'_>, backends: &[&str], filter: &FilterState) -> RenderedRow {
    let columns: Vec<(&str, Option<&Cell>)> = backends
        .iter()
        .map(|env| (*env, view.best_cell(env)))
        .collect();
    let winners = resolve_winners(&columns, &filter.tie_policy);

    RenderedRow {
        model: view.row.model.clone(),
        quant: view.row.quant.clone(),
        size_b: view.row.size_b,
        rpc: view.row.rpc,
        kernel_group: view.group.kernel.clone(),
        firmware_group: view.group.firmware.clone(),
        cells: columns
            .iter()
            .map(|(env, cell)| BackendCell {
                env: env.to_string(),
                cell: cell.cloned(),
                winner: winners.contains(env),
            })
            .collect(),
        winners: winners.iter().map(|w| w.to_string()).collect(),
    }
}

/// Compute the visible table for the active context.
///
/// Sections are ordered by test key, rows by model then group labels.
/// Tests with no visible rows are omitted; an unknown context renders empty.
pub fn render(index: &AggregationIndex, filter: &FilterState) -> RenderOutput {
    let backends = filter.active_backends(index);
    let mut output = RenderOutput {
        context: filter.context.clone(),
        backends: backends.iter().map(|b| b.to_string()).collect(),
        sections: Vec::new(),
    };

    let Some(context) = index.context(&filter.context) else {
        log::debug!("[Query] Context '{}' not in index", filter.context);
        return output;
    };

    for (test, group) in &context.tests {
        let mut rows: Vec<RenderedRow> = group
            .rows
            .values()
            .filter(|row| filter.row_visible(row))
            .flat_map(|row| expand_row(row, filter, &backends))
            .map(|view| resolve_view(&view, &backends, filter))
            .collect();
        if rows.is_empty() {
            continue;
        }
        rows.sort_by(|a, b| {
            a.model
                .cmp(&b.model)
                .then_with(|| a.kernel_group.cmp(&b.kernel_group))
                .then_with(|| a.firmware_group.cmp(&b.firmware_group))
        });
        output.sections.push(TestSection {
            test: test.clone(),
            label: group.label.clone(),
            rows,
        });
    }

    log::debug!(
        "[Query] Rendered {} rows in {} sections for context '{}'",
        output.row_count(),
        output.sections.len(),
        output.context
    );
    output
}
