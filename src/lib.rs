//! Benchmark Results Browser core
//!
//! Loads llama.cpp benchmark runs recorded across inference backends
//! (ROCm, Vulkan and others), indexes them by context, test and model,
//! and answers filtered queries: which cell is best per backend and which
//! backends tie for the win within measurement noise.
//!
//! The system is organized into functional modules:
//! - **error**: error type hierarchy
//! - **models**: the results file data model
//! - **results**: flatten → aggregate → filter → group → resolve pipeline
//! - **config**: results loading and persisted view settings
//! - **browser**: `ResultsBrowser`, the stateful entry point for a UI
//! - **log_collector**: background-thread logging backend for the `log` crate

pub mod browser;
pub mod config;
pub mod error;
pub mod log_collector;
pub mod models;
pub mod results;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use browser::{Facet, ResultsBrowser};
pub use config::{BrowserSettings, SettingsManager};
pub use error::{AppError, ConfigError, DataError, FilterError, Result};
pub use models::{Measurement, ResultsData, Run, SystemInfo, DEFAULT_CONTEXT, UNKNOWN_MODEL};
pub use results::{
    render, AggregationIndex, EmptySelection, FilterState, RenderOutput, RenderedRow,
    TestSection, TiePolicy,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_empty_browser_renders_nothing() {
        let browser = ResultsBrowser::new(ResultsData::default());
        let output = browser.render();
        assert!(output.is_empty());
        assert!(output.backends.is_empty());
        assert_eq!(output.context, DEFAULT_CONTEXT);
    }
}
