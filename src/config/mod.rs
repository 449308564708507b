//! Scene configuration and config-directory resolution

pub mod paths;
pub mod scene;

pub use paths::{config_file, ensure_dirs, PathConfig, CONFIG_DIR_ENV, LOG_FILE, SCENE_FILE};
pub use scene::{SceneConfig, PRESETS};
