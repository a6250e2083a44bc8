use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::history::DEFAULT_UNDO_DEPTH;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub undo_depth: usize,
    pub zoom: ZoomConfig,
    pub render: RenderConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_depth: DEFAULT_UNDO_DEPTH,
            zoom: ZoomConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub initial: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 2.0,
            step: 0.1,
            initial: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Scale of the full page view at 100% zoom.
    pub base_scale: f32,
    pub thumbnail_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_scale: 1.5,
            thumbnail_scale: 0.3,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: EditorConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Ok(config.sanitized())
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => {
                debug!(path = %path.display(), "loaded editor config");
                Self::from_toml_str(&raw, path)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn sanitized(mut self) -> Self {
        let defaults = ZoomConfig::default();
        let zoom = &mut self.zoom;
        if !(zoom.min.is_finite() && zoom.min > 0.0) {
            zoom.min = defaults.min;
        }
        if !zoom.max.is_finite() || zoom.max < zoom.min {
            zoom.max = zoom.min.max(defaults.max);
        }
        if !(zoom.step.is_finite() && zoom.step > 0.0) {
            zoom.step = defaults.step;
        }
        if !zoom.initial.is_finite() {
            zoom.initial = defaults.initial;
        }
        zoom.initial = zoom.initial.clamp(zoom.min, zoom.max);

        let render_defaults = RenderConfig::default();
        if !(self.render.base_scale.is_finite() && self.render.base_scale > 0.0) {
            self.render.base_scale = render_defaults.base_scale;
        }
        if !(self.render.thumbnail_scale.is_finite() && self.render.thumbnail_scale > 0.0) {
            self.render.thumbnail_scale = render_defaults.thumbnail_scale;
        }
        self.undo_depth = self.undo_depth.max(1);
        self
    }
}
