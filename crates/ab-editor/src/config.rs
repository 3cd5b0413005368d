//! Editor configuration.

use ab_core::{Error, LayoutConfig};
use serde::{Deserialize, Serialize};

/// Tunables for the editing engine. Missing JSON fields keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Maximum number of snapshots kept, baseline included.
    pub history_limit: usize,

    /// Offset applied to duplicated elements inside absolute containers.
    pub duplicate_offset: f32,

    pub layout: LayoutConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            duplicate_offset: 20.0,
            layout: LayoutConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut config: EditorConfig = serde_json::from_str(json)?;
        if config.history_limit == 0 {
            log::warn!("historyLimit 0 is not usable, keeping one snapshot");
            config.history_limit = 1;
        }
        if !config.duplicate_offset.is_finite() {
            config.duplicate_offset = 0.0;
        }
        Ok(config)
    }
}
