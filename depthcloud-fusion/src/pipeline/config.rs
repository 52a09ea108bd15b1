//! Pipeline configuration.

use crate::color::NEUTRAL_GRAY;
use crate::geometry::SensorOrientation;
use crate::throttle::DEFAULT_INTERVAL;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Named maximum-range presets, tuned per device capability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    /// High-confidence depth, 3 m.
    #[default]
    HighConfidence,
    /// Coarse depth, 8 m.
    Coarse,
}

impl RangePreset {
    pub fn all() -> &'static [RangePreset] {
        &[RangePreset::HighConfidence, RangePreset::Coarse]
    }

    pub fn max_range(&self) -> f32 {
        match self {
            RangePreset::HighConfidence => 3.0,
            RangePreset::Coarse => 8.0,
        }
    }
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangePreset::HighConfidence => write!(f, "high-confidence"),
            RangePreset::Coarse => write!(f, "coarse"),
        }
    }
}

impl FromStr for RangePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "high-confidence" => Ok(RangePreset::HighConfidence),
            "coarse" => Ok(RangePreset::Coarse),
            other => Err(format!(
                "unknown range preset '{other}', expected one of: high-confidence, coarse"
            )),
        }
    }
}

/// Configuration for [`PointCloudBuilder`](super::PointCloudBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum accepted depth in meters, inclusive.
    pub max_range: f32,
    /// Reproject points into the color image. When off every point is gray.
    pub enable_color_fusion: bool,
    /// Aim for roughly this many sampled columns across the depth grid.
    pub downsample_target_columns: usize,
    pub min_step: usize,
    pub max_step: usize,
    pub emit_interval_ms: u64,
    pub fallback_color: [f32; 3],
    pub orientation: SensorOrientation,
    /// Rescale intrinsics from the color resolution to the depth resolution
    /// before unprojecting depth pixels.
    pub rescale_depth_intrinsics: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::preset(RangePreset::default())
    }
}

impl PipelineConfig {
    pub fn preset(preset: RangePreset) -> Self {
        Self {
            max_range: preset.max_range(),
            enable_color_fusion: true,
            downsample_target_columns: 80,
            min_step: 2,
            max_step: 12,
            emit_interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            fallback_color: NEUTRAL_GRAY.to_array(),
            orientation: SensorOrientation::default(),
            rescale_depth_intrinsics: false,
        }
    }

    pub fn high_confidence() -> Self {
        Self::preset(RangePreset::HighConfidence)
    }

    pub fn coarse() -> Self {
        Self::preset(RangePreset::Coarse)
    }

    pub fn with_max_range(mut self, max_range: f32) -> Self {
        self.max_range = max_range;
        self
    }

    pub fn with_color_fusion(mut self, enabled: bool) -> Self {
        self.enable_color_fusion = enabled;
        self
    }

    pub fn with_downsample_target_columns(mut self, columns: usize) -> Self {
        self.downsample_target_columns = columns;
        self
    }

    pub fn with_step_bounds(mut self, min_step: usize, max_step: usize) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }

    pub fn with_emit_interval(mut self, interval: Duration) -> Self {
        self.emit_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_orientation(mut self, orientation: SensorOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_rescaled_depth_intrinsics(mut self, enabled: bool) -> Self {
        self.rescale_depth_intrinsics = enabled;
        self
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }

    pub fn fallback_color(&self) -> Vec3 {
        Vec3::from_array(self.fallback_color)
    }

    /// Depth grid stride for a grid `width` pixels wide:
    /// `width / downsample_target_columns`, clamped to `[min_step, max_step]`.
    pub fn stride_for_width(&self, width: usize) -> usize {
        let min = self.min_step.max(1);
        let max = self.max_step.max(min);
        let step = width
            .checked_div(self.downsample_target_columns)
            .unwrap_or(min);
        step.clamp(min, max)
    }

    /// Finite, positive and no farther than `max_range`.
    #[inline]
    pub fn is_valid_depth(&self, depth: f32) -> bool {
        depth.is_finite() && depth > 0.0 && depth <= self.max_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(PipelineConfig::default().max_range, 3.0);
        assert_eq!(PipelineConfig::high_confidence().max_range, 3.0);
        assert_eq!(PipelineConfig::coarse().max_range, 8.0);
        assert_eq!(PipelineConfig::default().emit_interval(), Duration::from_millis(100));
        assert_eq!(PipelineConfig::default().fallback_color(), Vec3::splat(0.6));
    }

    #[test]
    fn test_preset_names() {
        for preset in RangePreset::all() {
            assert_eq!(preset.to_string().parse::<RangePreset>(), Ok(*preset));
        }
        assert_eq!("HIGH_CONFIDENCE".parse::<RangePreset>(), Ok(RangePreset::HighConfidence));
        assert!("medium".parse::<RangePreset>().is_err());
    }

    #[test]
    fn test_stride_for_width() {
        let config = PipelineConfig::default();
        assert_eq!(config.stride_for_width(0), 2);
        assert_eq!(config.stride_for_width(100), 2);
        assert_eq!(config.stride_for_width(256), 3);
        assert_eq!(config.stride_for_width(640), 8);
        assert_eq!(config.stride_for_width(1920), 12);
    }

    #[test]
    fn test_stride_with_degenerate_bounds() {
        let config = PipelineConfig::default()
            .with_downsample_target_columns(0)
            .with_step_bounds(0, 0);
        assert_eq!(config.stride_for_width(640), 1);
    }

    #[test]
    fn test_depth_validity() {
        let config = PipelineConfig::coarse();
        assert!(config.is_valid_depth(0.01));
        assert!(config.is_valid_depth(8.0));
        assert!(!config.is_valid_depth(8.01));
        assert!(!config.is_valid_depth(0.0));
        assert!(!config.is_valid_depth(-1.0));
        assert!(!config.is_valid_depth(f32::NAN));
        assert!(!config.is_valid_depth(f32::INFINITY));
    }

    #[test]
    fn test_json_missing_fields_use_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "max_range": 5.5, "orientation": "landscape_left" }"#)
                .unwrap();
        assert_eq!(config.max_range, 5.5);
        assert_eq!(config.orientation, SensorOrientation::LandscapeLeft);
        assert_eq!(config.downsample_target_columns, 80);
        assert!(config.enable_color_fusion);
    }
}
