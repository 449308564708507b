//! Named scene locations bound to fixed frames

use indexmap::IndexMap;

use super::error::ConfigError;
use super::frame::FrameIndex;

/// Immutable name -> frame mapping. Iterates in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    sections: IndexMap<String, FrameIndex>,
}

impl SectionMap {
    /// Build from configuration; every frame must be below `total_frames`.
    pub fn new<I, S>(entries: I, total_frames: usize) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, FrameIndex)>,
        S: Into<String>,
    {
        let mut sections = IndexMap::new();
        for (name, frame) in entries {
            let name = name.into();
            if frame >= total_frames {
                return Err(ConfigError::SectionOutOfRange {
                    name,
                    frame,
                    total_frames,
                });
            }
            sections.insert(name, frame);
        }
        Ok(Self { sections })
    }

    pub fn resolve(&self, name: &str) -> Option<FrameIndex> {
        self.sections.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FrameIndex)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
