//! Solver configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the flex/grid solvers and the reflow coordinator.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Size used when a basis or child size is not a finite number.
    pub fallback_size: f32,

    /// Two rectangles closer than this on every component are "unchanged".
    pub epsilon: f32,

    /// Rows scanned for a free grid slot before appending a new row.
    pub grid_probe_limit: usize,

    /// Upper bound on settle iterations when nested containers feed back
    /// into each other.
    pub settle_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            fallback_size: 100.0,
            epsilon: 0.01,
            grid_probe_limit: 1000,
            settle_passes: 8,
        }
    }
}
