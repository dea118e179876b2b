use std::path::Path;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum backlink context length, in characters.
    pub context_window: usize,
    pub search: SearchConfig,
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on edit distance accepted by typo-tolerant matching.
    pub max_typo_distance: usize,
    /// Hits scoring below this are discarded.
    pub min_score: u32,
    /// Maximum hits returned per query.
    pub limit: usize,
    /// Characters of context kept on each side of a content match.
    pub snippet_radius: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub repulsion: f32,
    pub spring_length: f32,
    pub spring_strength: f32,
    /// Velocity multiplier applied every step, in `0.0..1.0`.
    pub damping: f32,
    /// Pull toward the origin, keeps disconnected components on screen.
    pub centering: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_window: 160,
            search: SearchConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_typo_distance: 2,
            min_score: 1,
            limit: 50,
            snippet_radius: 40,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: 800.0,
            spring_length: 60.0,
            spring_strength: 0.05,
            damping: 0.85,
            centering: 0.002,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }
}
