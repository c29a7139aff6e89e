//! Engine configuration.
//!
//! Every field has a default, so the host may pass a partial JSON object
//! (or none at all).

use serde::{Deserialize, Serialize};

use crate::layout::LayoutConfig;
use crate::lineage::BranchPath;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    /// Branch given to a join whose incoming branches share no prefix.
    pub root_branch: String,
    pub palette: Palette,
    /// Picture attached to new image nodes.
    pub image_url: Option<String>,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }

    pub fn root_branch(&self) -> BranchPath {
        BranchPath::from(self.root_branch.as_str())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            root_branch: "root".to_string(),
            palette: Palette::default(),
            image_url: None,
        }
    }
}

/// Node fill colours. Derived, never stored on nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub regular: String,
    pub join: String,
    pub terminal: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            regular: "lightblue".to_string(),
            join: "gray".to_string(),
            terminal: "yellow".to_string(),
        }
    }
}
