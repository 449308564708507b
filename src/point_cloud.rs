//! Single frame -> 3D point cloud
//!
//! Every `skip`-th pixel becomes one point. X/Y come from the pixel position,
//! normalized so the image spans [-1, 1] horizontally; Z is the pixel's
//! brightness pushed toward the camera. Not a depth reconstruction, just a
//! relief effect.

use glam::Vec3;
use image::RgbaImage;
use log::debug;
use rayon::prelude::*;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCloudParams {
    /// Sample every n-th pixel in both axes (0 is treated as 1)
    pub skip: u32,
    /// Z = brightness * depth_scale
    pub depth_scale: f32,
}

impl Default for PointCloudParams {
    fn default() -> Self {
        Self {
            skip: 4,
            depth_scale: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudPoint {
    pub position: Vec3,
    /// Normalized RGB
    pub color: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<CloudPoint>,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounds, None when empty
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.points.first()?.position;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.min(p.position), hi.max(p.position))
        }))
    }
}

/// Sample `image` into a point cloud. Rows are processed in parallel.
pub fn image_to_point_cloud(image: &RgbaImage, params: &PointCloudParams) -> PointCloud {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return PointCloud::default();
    }
    let skip = params.skip.max(1);
    let half_w = w as f32 / 2.0;
    let half_h = h as f32 / 2.0;
    let scale = half_w;

    let rows: Vec<u32> = (0..h).step_by(skip as usize).collect();
    let points: Vec<CloudPoint> = rows
        .par_iter()
        .flat_map_iter(|&y| {
            (0..w).step_by(skip as usize).map(move |x| {
                let px = image.get_pixel(x, y);
                let color = Vec3::new(
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                );
                let brightness = (color.x + color.y + color.z) / 3.0;
                CloudPoint {
                    position: Vec3::new(
                        (x as f32 - half_w) / scale,
                        -(y as f32 - half_h) / scale,
                        brightness * params.depth_scale,
                    ),
                    color,
                }
            })
        })
        .collect();

    debug!("Point cloud: {}x{} skip {} -> {} points", w, h, skip, points.len());
    PointCloud { points }
}

/// Write ASCII PLY with float positions and 8-bit colors
pub fn write_ply<W: Write>(cloud: &PointCloud, mut out: W) -> io::Result<()> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", cloud.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(out, "property float {}", axis)?;
    }
    for channel in ["red", "green", "blue"] {
        writeln!(out, "property uchar {}", channel)?;
    }
    writeln!(out, "end_header")?;
    for p in &cloud.points {
        let c = (p.color * 255.0).round().clamp(Vec3::ZERO, Vec3::splat(255.0));
        writeln!(
            out,
            "{} {} {} {} {} {}",
            p.position.x, p.position.y, p.position.z, c.x as u8, c.y as u8, c.z as u8
        )?;
    }
    out.flush()
}
