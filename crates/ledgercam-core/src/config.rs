// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LedgercamError, Result};

/// Settings the caller supplies to a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frames larger than this on either side are downscaled before detection.
    pub max_processing_dimension: u32,
    /// Shorter side of a rectified image is upscaled to at least this.
    pub min_output_dimension: u32,
    /// JPEG quality on the 1-100 scale (95 == 0.95).
    pub jpeg_quality: u8,
    /// Pointer hit radius around a corner, in frame pixels.
    pub touch_radius: f32,
    /// Radius multiplier for corners inside the edge zone.
    pub edge_zone_multiplier: f32,
    /// Width of the edge zone as a fraction of the shorter frame side.
    pub edge_zone_fraction: f32,
    /// Interval between automatic detection ticks.
    pub detection_interval_ms: u64,
    /// How long to wait for the vision engine before allowing raw capture only.
    pub readiness_timeout_ms: u64,
    /// Optional size budget for the uploaded artifact.
    pub max_upload_bytes: Option<usize>,
    /// Corner detector tuning.
    pub detector: DetectorParams,
    /// Post-rectification enhancement tuning.
    pub enhance: EnhanceParams,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_processing_dimension: 1920,
            min_output_dimension: 1400,
            jpeg_quality: 95,
            touch_radius: 60.0,
            edge_zone_multiplier: 2.0,
            edge_zone_fraction: 0.08,
            detection_interval_ms: 100,
            readiness_timeout_ms: 30_000,
            max_upload_bytes: None,
            detector: DetectorParams::default(),
            enhance: EnhanceParams::default(),
        }
    }
}

impl CaptureConfig {
    /// Parse a config from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Check every field is in a usable range.
    pub fn validate(&self) -> Result<()> {
        if self.max_processing_dimension < 64 {
            return Err(invalid("max_processing_dimension must be at least 64"));
        }
        if self.min_output_dimension == 0 {
            return Err(invalid("min_output_dimension must be positive"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid("jpeg_quality must be within 1..=100"));
        }
        if !(self.touch_radius > 0.0) {
            return Err(invalid("touch_radius must be positive"));
        }
        if self.edge_zone_multiplier < 1.0 {
            return Err(invalid("edge_zone_multiplier must be at least 1.0"));
        }
        if !(0.0..0.5).contains(&self.edge_zone_fraction) {
            return Err(invalid("edge_zone_fraction must be within [0, 0.5)"));
        }
        if self.detection_interval_ms == 0 {
            return Err(invalid("detection_interval_ms must be positive"));
        }
        self.detector.validate()?;
        self.enhance.validate()
    }
}

/// Tunable thresholds for the corner detector.
///
/// Every value here is empirical. The defaults sit inside the ranges that
/// worked on real receipt photos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Reject contours smaller than this fraction of the frame area.
    pub min_area_fraction: f64,
    /// Reject contours larger than this fraction of the frame area.
    pub max_area_fraction: f64,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_fraction: f64,
    /// Smallest accepted interior angle, in degrees.
    pub min_angle_deg: f64,
    /// Largest accepted interior angle, in degrees.
    pub max_angle_deg: f64,
    /// Smallest accepted opposite-side length ratio.
    pub min_side_ratio: f64,
    /// Largest accepted opposite-side length ratio.
    pub max_side_ratio: f64,
    pub area_weight: f64,
    pub center_weight: f64,
    pub perimeter_weight: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub blur_sigma: f32,
    /// CLAHE tile grid (tiles per side).
    pub clahe_tiles: u32,
    pub clahe_clip_limit: f32,
    /// Chebyshev radius of the edge-map dilation.
    pub dilate_radius: u8,
    /// Follow the dilation with an erosion of the same radius.
    pub close_edges: bool,
    /// Refit each side against the raw edge map after selection.
    pub refine_sides: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.10,
            max_area_fraction: 0.95,
            approx_epsilon_fraction: 0.02,
            min_angle_deg: 60.0,
            max_angle_deg: 120.0,
            min_side_ratio: 0.7,
            max_side_ratio: 1.3,
            area_weight: 0.75,
            center_weight: 0.15,
            perimeter_weight: 0.10,
            canny_low: 50.0,
            canny_high: 150.0,
            blur_sigma: 1.5,
            clahe_tiles: 8,
            clahe_clip_limit: 2.0,
            dilate_radius: 1,
            close_edges: false,
            refine_sides: true,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.min_area_fraction)
            || !(self.min_area_fraction < self.max_area_fraction && self.max_area_fraction <= 1.0)
        {
            return Err(invalid("area fractions must satisfy 0 <= min < max <= 1"));
        }
        if !(self.approx_epsilon_fraction > 0.0 && self.approx_epsilon_fraction < 0.2) {
            return Err(invalid("approx_epsilon_fraction must be within (0, 0.2)"));
        }
        let angles_ok = 0.0 < self.min_angle_deg
            && self.min_angle_deg < 90.0
            && self.max_angle_deg > 90.0
            && self.max_angle_deg < 180.0;
        if !angles_ok {
            return Err(invalid("angle band must bracket 90 degrees"));
        }
        if !(0.0 < self.min_side_ratio && self.min_side_ratio <= 1.0 && self.max_side_ratio >= 1.0) {
            return Err(invalid("side ratio band must bracket 1.0"));
        }
        if self.area_weight < 0.0 || self.center_weight < 0.0 || self.perimeter_weight < 0.0 {
            return Err(invalid("score weights must be non-negative"));
        }
        if !(self.canny_low > 0.0 && self.canny_low <= self.canny_high) {
            return Err(invalid("canny thresholds must satisfy 0 < low <= high"));
        }
        if !(self.blur_sigma > 0.0) {
            return Err(invalid("blur_sigma must be positive"));
        }
        if self.clahe_tiles == 0 || !(self.clahe_clip_limit >= 1.0) {
            return Err(invalid("CLAHE needs at least one tile and a clip limit >= 1"));
        }
        Ok(())
    }
}

/// Tuning for the OCR legibility pass applied after rectification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceParams {
    /// Skip post-processing entirely when false.
    pub enabled: bool,
    pub clahe_tiles: u32,
    pub clahe_clip_limit: f32,
    /// Gaussian sigma of the unsharp mask.
    pub sharpen_sigma: f32,
    /// Unsharp mask strength; 0 disables sharpening.
    pub sharpen_amount: f32,
    /// Push near-white to white and near-black to black after enhancement.
    pub level_clamp: bool,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            enabled: true,
            clahe_tiles: 8,
            clahe_clip_limit: 2.0,
            sharpen_sigma: 1.0,
            sharpen_amount: 0.6,
            level_clamp: false,
        }
    }
}

impl EnhanceParams {
    pub fn validate(&self) -> Result<()> {
        if self.clahe_tiles == 0 || !(self.clahe_clip_limit >= 1.0) {
            return Err(invalid("CLAHE needs at least one tile and a clip limit >= 1"));
        }
        if !(self.sharpen_sigma > 0.0) || self.sharpen_amount < 0.0 {
            return Err(invalid("sharpen sigma must be positive and amount non-negative"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> LedgercamError {
    LedgercamError::InvalidConfig(msg.to_owned())
}
