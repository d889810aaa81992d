//! Results aggregation and query pipeline.
//!
//! Data flows one way per render:
//!
//! ```text
//! runs --flatten--> entries + facets --aggregate--> AggregationIndex
//!                                                        |
//!                      FilterState --------------> render()
//!                                                        |
//!                  filter rows / cells -> expand groups -> best cell per backend -> winners
//! ```
//!
//! # Module Structure
//!
//! - `timestamp`: run-id timestamp extraction and date helpers
//! - `flatten`: per-measurement entries and facet option lists
//! - `aggregate`: the context → test → model index
//! - `filter`: filter state, row/cell checks, best-cell selection
//! - `winners`: tolerance-band tie resolution
//! - `grouping`: kernel/firmware row expansion
//! - `query`: the `render` entry point

pub mod aggregate;
pub mod filter;
pub mod flatten;
pub mod grouping;
pub mod query;
pub mod timestamp;
pub mod winners;

pub use aggregate::{AggregatedRow, AggregationIndex, Bounds, Cell, CellKey, ContextEntry, TestGroup};
pub use filter::{best_cell, DateRange, EmptySelection, FilterState, SizeRange, SIZE_EPSILON};
pub use flatten::{flatten_runs, FacetOptions, FlatEntry, Flattened};
pub use grouping::{expand_row, GroupKey, RowView, UNKNOWN_GROUP};
pub use query::{render, BackendCell, RenderOutput, RenderedRow, TestSection};
pub use timestamp::run_timestamp;
pub use winners::{resolve_winners, Stat, TiePolicy};
