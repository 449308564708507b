//! Scene configuration: frame sequence, motion tuning, zoom, sections
//!
//! Loaded from JSON; every field has a default so partial files work:
//!
//! ```json
//! {
//!   "name": "pier",
//!   "total_frames": 838,
//!   "frames": { "dir": "ImagenesWeb", "prefix": "MS_PierHouseWeb_RTX_", "padding": 4, "extension": "webp" },
//!   "sections": { "playa": 796, "arboles": 672 },
//!   "load_policy": { "mode": "lazy", "radius": 8 }
//! }
//! ```

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::cache::LoadPolicy;
use crate::core::controller::ZoomRange;
use crate::core::error::ConfigError;
use crate::core::frame::FramePathTemplate;
use crate::core::motion::MotionParams;
use crate::core::render::PlaneTransform;
use crate::core::sections::SectionMap;

/// Names accepted by `SceneConfig::preset`
pub const PRESETS: &[&str] = &["pier-house", "model-zentro"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub name: String,
    pub total_frames: usize,
    pub frames: FramePathTemplate,
    /// Frames per tick while AutoPlaying
    pub play_speed: f64,
    pub alpha_frame: f64,
    pub alpha_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Clamped into [min_zoom, max_zoom] at start
    pub initial_zoom: f64,
    pub zoom_step: f64,
    pub wheel_zoom_factor: f64,
    /// Pixels of drag per frame
    pub sensitivity_divisor: f64,
    /// `end()` lands this many frames before the last one
    pub end_offset: usize,
    pub sections: IndexMap<String, usize>,
    pub load_policy: LoadPolicy,
    pub plane_width: f32,
    pub plane_height: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "scene".to_string(),
            total_frames: 1,
            frames: FramePathTemplate::default(),
            play_speed: 1.0,
            alpha_frame: 0.1,
            alpha_zoom: 0.1,
            min_zoom: 1.2,
            max_zoom: 4.0,
            initial_zoom: 2.0,
            zoom_step: 0.4,
            wheel_zoom_factor: 0.001,
            sensitivity_divisor: 2.0,
            end_offset: 20,
            sections: IndexMap::new(),
            load_policy: LoadPolicy::Eager,
            plane_width: 1.6,
            plane_height: 1.0,
        }
    }
}

impl SceneConfig {
    /// Waterfront house fly-through: 838 webp frames
    pub fn pier_house() -> Self {
        Self {
            name: "pier-house".to_string(),
            total_frames: 838,
            frames: FramePathTemplate {
                dir: "ImagenesWeb".into(),
                prefix: "MS_PierHouseWeb_RTX_".into(),
                padding: 4,
                first_number: 0,
                extension: "webp".into(),
            },
            play_speed: 1.2,
            alpha_frame: 0.08,
            alpha_zoom: 0.1,
            initial_zoom: 1.0,
            // drag factor 0.5
            sensitivity_divisor: 2.0,
            sections: [("playa", 796), ("arboles", 672), ("casa", 650)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..Self::default()
        }
    }

    /// Model turntable: 52 jpg frames numbered from 1
    pub fn model_zentro() -> Self {
        Self {
            name: "model-zentro".to_string(),
            total_frames: 52,
            frames: FramePathTemplate {
                dir: "framesmodel".into(),
                prefix: "frame".into(),
                padding: 0,
                first_number: 1,
                extension: "jpg".into(),
            },
            play_speed: 1.0,
            alpha_frame: 0.1,
            alpha_zoom: 0.1,
            initial_zoom: 2.0,
            sensitivity_divisor: 5.0,
            sections: [("terraza", 36), ("arboles", 6), ("sala", 25), ("habitacion", 48)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..Self::default()
        }
    }

    /// Built-in scene by name (see `PRESETS`)
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "pier-house" | "pier" => Ok(Self::pier_house()),
            "model-zentro" | "zentro" => Ok(Self::model_zentro()),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Read and validate a JSON scene file.
    ///
    /// Relative frame directories are resolved against the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut config: SceneConfig = serde_json::from_str(&text).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if config.frames.dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.frames.dir = parent.join(&config.frames.dir);
            }
        }
        config.validate()?;
        info!("Loaded scene '{}' from {}", config.name, path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every construction-time constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_frames == 0 {
            return Err(ConfigError::NoFrames);
        }
        for (name, value) in [("alpha_frame", self.alpha_frame), ("alpha_zoom", self.alpha_zoom)] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(ConfigError::Smoothing { name, value });
            }
        }
        for (name, value) in [
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("initial_zoom", self.initial_zoom),
            ("wheel_zoom_factor", self.wheel_zoom_factor),
            ("play_speed", self.play_speed),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name, value });
            }
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::ZoomBounds {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        for (name, value) in [
            ("zoom_step", self.zoom_step),
            ("sensitivity_divisor", self.sensitivity_divisor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        for (name, value) in [("plane_width", self.plane_width), ("plane_height", self.plane_height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive {
                    name,
                    value: value as f64,
                });
            }
        }
        self.section_map()?;
        debug!("Scene '{}' valid: {} frames", self.name, self.total_frames);
        Ok(())
    }

    pub fn section_map(&self) -> Result<SectionMap, ConfigError> {
        SectionMap::new(
            self.sections.iter().map(|(k, v)| (k.clone(), *v)),
            self.total_frames,
        )
    }

    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            alpha_frame: self.alpha_frame,
            alpha_zoom: self.alpha_zoom,
            play_speed: self.play_speed,
        }
    }

    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange {
            min: self.min_zoom,
            max: self.max_zoom,
            step: self.zoom_step,
        }
    }

    pub fn plane(&self) -> PlaneTransform {
        PlaneTransform::new(self.plane_width, self.plane_height)
    }
}
