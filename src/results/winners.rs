//! Winner / tie resolution.
//!
//! A backend wins a row when its mean is within a noise band of the best
//! mean. The band is `max(floor, k * sqrt(best.std² + v.std²))`, so small
//! differences that the measurement noise cannot separate count as ties.

use super::aggregate::Cell;
use serde::{Deserialize, Serialize};

/// Tolerance parameters for tie detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiePolicy {
    /// Minimum band, in tokens/s
    pub floor: f64,
    /// Multiplier applied to the pooled standard deviation
    pub sigma_multiplier: f64,
}

impl Default for TiePolicy {
    fn default() -> Self {
        TiePolicy {
            floor: 0.25,
            sigma_multiplier: 1.0,
        }
    }
}

impl TiePolicy {
    /// Allowed gap below the leader for a candidate with the given stds.
    pub fn tolerance(&self, best_std: f64, std: f64) -> f64 {
        let pooled = (best_std * best_std + std * std).sqrt();
        self.floor.max(self.sigma_multiplier * pooled)
    }

    pub fn is_tied(&self, best: Stat, candidate: Stat) -> bool {
        best.mean - candidate.mean <= self.tolerance(best.std, candidate.std)
    }
}

/// Mean and standard deviation of a usable cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
    pub mean: f64,
    pub std: f64,
}

impl Stat {
    /// `None` for error cells and cells without a mean; a missing std is 0.
    pub fn from_cell(cell: &Cell) -> Option<Stat> {
        let mean = cell.usable_mean()?;
        let std = cell.std.filter(|s| s.is_finite()).unwrap_or(0.0);
        Some(Stat { mean, std })
    }
}

/// Backends statistically tied for best, in column order.
///
/// `columns` pairs each active backend with its best cell for the row.
pub fn resolve_winners<'a>(columns: &[(&'a str, Option<&Cell>)], policy: &TiePolicy) -> Vec<&'a str> {
    let candidates: Vec<(&'a str, Stat)> = columns
        .iter()
        .filter_map(|(env, cell)| cell.and_then(Stat::from_cell).map(|stat| (*env, stat)))
        .collect();

    let Some(best) = candidates
        .iter()
        .map(|(_, stat)| *stat)
        .reduce(|best, stat| if stat.mean > best.mean { stat } else { best })
    else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter(|(_, stat)| policy.is_tied(best, *stat))
        .map(|(env, _)| *env)
        .collect()
}
