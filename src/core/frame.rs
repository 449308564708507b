//! Frame indices and the frame-path naming convention
//!
//! Frame positions are real-valued and unbounded while scrubbing; they are
//! folded into `[0, total_frames)` only when a concrete frame is needed.
//! Folding always wraps (Euclidean remainder), it never clamps, so dragging
//! past the last frame continues from the first and vice versa.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Index of one still in the pre-rendered sequence, always in `[0, total_frames)`
pub type FrameIndex = usize;

/// Wrap an integer frame number into `[0, total_frames)`.
///
/// Equivalent to `((k % n) + n) % n`; negative inputs wrap from the end.
///
/// # Panics
///
/// Panics if `total_frames` is zero. Scene validation rejects that case
/// before an engine can be built.
pub fn wrap_frame(k: i64, total_frames: usize) -> FrameIndex {
    k.rem_euclid(total_frames as i64) as FrameIndex
}

/// Frame shown for a real-valued position: round, then wrap.
pub fn display_frame(position: f64, total_frames: usize) -> FrameIndex {
    wrap_frame(position.round() as i64, total_frames)
}

/// Maps a frame index to an asset path.
///
/// `path(i) = dir / prefix + zero_pad(i + first_number, padding) + "." + extension`
///
/// `first_number` covers 0-based and 1-based captures as well as renders
/// whose numbering starts at an arbitrary frame (e.g. 1000).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramePathTemplate {
    pub dir: PathBuf,
    pub prefix: String,
    pub padding: usize,
    pub first_number: u32,
    pub extension: String,
}

impl Default for FramePathTemplate {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("frames"),
            prefix: "frame_".to_string(),
            padding: 4,
            first_number: 0,
            extension: "png".to_string(),
        }
    }
}

impl FramePathTemplate {
    /// File name (without directory) for a frame index
    pub fn file_name(&self, index: FrameIndex) -> String {
        let number = index as u64 + self.first_number as u64;
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            number,
            self.extension.trim_start_matches('.'),
            width = self.padding
        )
    }

    /// Full path for a frame index
    pub fn path(&self, index: FrameIndex) -> PathBuf {
        self.dir.join(self.file_name(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_frame_stays_in_range() {
        for n in [1usize, 2, 7, 52, 838] {
            for k in -5000i64..5000 {
                let f = wrap_frame(k, n);
                assert!(f < n, "k={} n={} -> {}", k, n, f);
                assert_eq!(f as i64, ((k % n as i64) + n as i64) % n as i64);
            }
        }
    }

    #[test]
    fn test_wrap_frame_extremes() {
        assert_eq!(wrap_frame(i64::MIN, 838), i64::MIN.rem_euclid(838) as usize);
        assert!(wrap_frame(i64::MAX, 838) < 838);
        assert_eq!(wrap_frame(-1, 838), 837);
        assert_eq!(wrap_frame(838, 838), 0);
        assert_eq!(wrap_frame(-838 * 3 - 2, 838), 836);
    }

    #[test]
    fn test_display_frame_rounds_then_wraps() {
        assert_eq!(display_frame(0.4, 10), 0);
        assert_eq!(display_frame(0.6, 10), 1);
        assert_eq!(display_frame(-0.6, 10), 9);
        assert_eq!(display_frame(-10.2, 10), 0);
        assert_eq!(display_frame(1e12, 838), wrap_frame(1_000_000_000_000, 838));
    }

    #[test]
    fn test_path_template_zero_based() {
        let t = FramePathTemplate {
            dir: PathBuf::from("ImagenesWeb"),
            prefix: "MS_PierHouseWeb_RTX_".into(),
            padding: 4,
            first_number: 0,
            extension: "webp".into(),
        };
        assert_eq!(t.file_name(7), "MS_PierHouseWeb_RTX_0007.webp");
        assert_eq!(
            t.path(837),
            PathBuf::from("ImagenesWeb").join("MS_PierHouseWeb_RTX_0837.webp")
        );
    }

    #[test]
    fn test_path_template_offsets_and_no_padding() {
        let t = FramePathTemplate {
            dir: PathBuf::from("framesmodel"),
            prefix: "frame".into(),
            padding: 0,
            first_number: 1,
            extension: ".jpg".into(),
        };
        assert_eq!(t.file_name(0), "frame1.jpg");
        assert_eq!(t.file_name(51), "frame52.jpg");

        let t = FramePathTemplate {
            first_number: 1000,
            ..FramePathTemplate::default()
        };
        assert_eq!(t.file_name(4), "frame_1004.png");
    }

    #[test]
    fn test_padding_narrower_than_number() {
        let t = FramePathTemplate {
            padding: 2,
            ..FramePathTemplate::default()
        };
        assert_eq!(t.file_name(1234), "frame_1234.png");
    }
}
