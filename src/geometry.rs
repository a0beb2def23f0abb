use serde::{Deserialize, Serialize};

use crate::model::{CanvasSize, Point};

/// Distances are logical pixels; device pixels are logical times scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub column_gap: f32,
    pub row_gap: f32,
    pub padding: Padding,
    pub node_radius: f32,
    /// Labels may use `column_gap - label_margin` pixels.
    pub label_margin: f32,
    pub max_badges: usize,
    /// Vertical spacing between the edges leaving a merge commit.
    pub fan_out_step: f32,
    pub min_control_dx: f32,
    /// Extra radius around a node that still counts as a hit.
    pub hit_slop: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_step: f32,
    pub wheel_zoom_in: f32,
    pub wheel_zoom_out: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_gap: 180.0,
            row_gap: 52.0,
            padding: Padding::default(),
            node_radius: 7.0,
            label_margin: 24.0,
            max_badges: 3,
            fan_out_step: 6.0,
            min_control_dx: 10.0,
            hit_slop: 4.0,
            min_scale: 0.5,
            max_scale: 3.0,
            zoom_step: 1.1,
            wheel_zoom_in: 1.1,
            wheel_zoom_out: 0.9,
        }
    }
}

impl LayoutConfig {
    pub fn max_label_width(&self) -> f32 {
        (self.column_gap - self.label_margin).max(0.0)
    }

    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: 96.0,
            right: 64.0,
            bottom: 96.0,
            left: 64.0,
        }
    }
}

/// Maps commit indices and lanes to logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    config: LayoutConfig,
    special_lane: usize,
}

impl CoordinateMapper {
    pub fn new(config: LayoutConfig, special_lane: usize) -> Self {
        Self {
            config,
            special_lane,
        }
    }

    pub fn special_lane(&self) -> usize {
        self.special_lane
    }

    pub fn x(&self, index: usize) -> f32 {
        self.config.padding.left + index as f32 * self.config.column_gap
    }

    pub fn y_base(&self, lane: usize) -> f32 {
        self.config.padding.top + lane as f32 * self.config.row_gap
    }

    /// Lanes below the special lane are pushed down by one extra row.
    pub fn y(&self, lane: usize) -> f32 {
        if lane > self.special_lane {
            self.y_base(lane) + self.config.row_gap
        } else {
            self.y_base(lane)
        }
    }

    pub fn point(&self, index: usize, lane: usize) -> Point {
        Point {
            x: self.x(index),
            y: self.y(lane),
        }
    }

    pub fn has_extra_gap(&self, lane_count: usize) -> bool {
        lane_count > self.special_lane + 1
    }

    pub fn canvas_size(&self, commit_count: usize, lane_count: usize, scale: f32) -> CanvasSize {
        let padding = self.config.padding;
        let extra = if self.has_extra_gap(lane_count) {
            self.config.row_gap
        } else {
            0.0
        };
        let width = padding.left + padding.right + commit_count as f32 * self.config.column_gap;
        let height =
            padding.top + padding.bottom + lane_count as f32 * self.config.row_gap + extra;

        CanvasSize {
            width: width * scale,
            height: height * scale,
        }
    }
}
