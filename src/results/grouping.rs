//! Secondary grouping by kernel and/or firmware.
//!
//! With grouping on, a row is split into one synthetic row per distinct
//! (kernel, firmware) combination among its passing cells. Synthetic rows
//! borrow the original row and carry only their partition's cells.

use super::aggregate::{AggregatedRow, Cell};
use super::filter::{best_cell, FilterState};
use std::collections::BTreeMap;

/// Label for cells whose system did not report the grouped value.
pub const UNKNOWN_GROUP: &str = "unknown";

/// Partition key. Each half is `None` when grouping by it is off.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub kernel: Option<String>,
    pub firmware: Option<String>,
}

impl GroupKey {
    pub fn for_cell(cell: &Cell, by_kernel: bool, by_firmware: bool) -> Self {
        let label = |value: Option<&str>| value.unwrap_or(UNKNOWN_GROUP).to_string();
        GroupKey {
            kernel: by_kernel.then(|| label(cell.kernel())),
            firmware: by_firmware.then(|| label(cell.firmware())),
        }
    }
}

/// A row restricted to a subset of its cells.
#[derive(Debug, Clone)]
pub struct RowView<'a> {
    pub row: &'a AggregatedRow,
    pub cells: Vec<&'a Cell>,
    pub group: GroupKey,
}

impl<'a> RowView<'a> {
    /// The whole row, keeping only cells that pass the filter.
    pub fn whole(row: &'a AggregatedRow, filter: &FilterState) -> Self {
        RowView {
            row,
            cells: row.cells.values().filter(|c| filter.cell_passes(c)).collect(),
            group: GroupKey::default(),
        }
    }

    pub fn best_cell(&self, env: &str) -> Option<&'a Cell> {
        best_cell(self.cells.iter().copied(), env)
    }

    /// True when at least one active backend has a cell to show.
    pub fn has_visible_cell(&self, backends: &[&str]) -> bool {
        backends.iter().any(|env| self.best_cell(env).is_some())
    }
}

/// Expand a row into the views to display, suppressing empty ones.
///
/// Without grouping this is the row itself. Views come back ordered by
/// kernel label, then firmware label.
pub fn expand_row<'a>(
    row: &'a AggregatedRow,
    filter: &FilterState,
    backends: &[&str],
) -> Vec<RowView<'a>> {
    let whole = RowView::whole(row, filter);
    if !filter.grouping_enabled() {
        return if whole.has_visible_cell(backends) {
            vec![whole]
        } else {
            Vec::new()
        };
    }

    let mut partitions: BTreeMap<GroupKey, Vec<&'a Cell>> = BTreeMap::new();
    for cell in whole.cells {
        let key = GroupKey::for_cell(cell, filter.group_by_kernel, filter.group_by_firmware);
        partitions.entry(key).or_default().push(cell);
    }

    partitions
        .into_iter()
        .map(|(group, cells)| RowView { row, cells, group })
        .filter(|view| view.has_visible_cell(backends))
        .collect()
}
