use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr, VariantNames};

use crate::{
    brush::Brush,
    error::{ColoringError, Result},
    types::Rgb,
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum SessionCommand {
    /// Flood fill the region under a point
    #[serde(rename = "fill")]
    Fill { x: f64, y: f64, color: Rgb },

    /// Freehand stroke through a list of pointer positions
    #[serde(rename = "stroke")]
    Stroke {
        #[schemars(length(min = 1))]
        points: Vec<[f64; 2]>,
        brush: Brush,
    },

    #[serde(rename = "undo")]
    Undo,

    #[serde(rename = "redo")]
    Redo,

    /// Clear all coloring and history for the current page
    #[serde(rename = "reset")]
    Reset,
}

impl SessionCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SessionCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Fill { .. } => "Flood fill the enclosed region under a point with a color",
            Self::Stroke { .. } => "Paint or erase along a freehand path",
            Self::Undo => "Step back to the previous snapshot",
            Self::Redo => "Step forward to the next snapshot",
            Self::Reset => "Clear the page's coloring and history",
        }
    }
}

/// An ordered list of commands replayed against one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommandScript {
    pub commands: Vec<SessionCommand>,
}

impl CommandScript {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Auto-detect file format and load the script
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?),
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?),
            _ => Err(ColoringError::UnsupportedFileFormat),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
