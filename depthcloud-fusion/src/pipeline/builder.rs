//! Per-event point cloud construction.
//!
//! Both paths run the same gates before touching any buffer: an attached sink,
//! `Recording`, then the rate limiter. A frame that fails a gate costs nothing
//! beyond the camera-state copy.

use super::config::PipelineConfig;
use crate::color;
use crate::control::SessionState;
use crate::geometry::{ProjectionView, Reprojector, unproject_depth_pixel, unproject_mesh_vertex};
use crate::ingest::{DepthUpdate, GenerationMode, MeshAnchorUpdate, SensorFrameEvent};
use depthcloud_data::{CameraState, ColorFrame, MeshAnchor, PointBatch, PointRecord};
use glam::Vec3;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Builds colored world-space point batches from sensor events.
pub struct PointCloudBuilder {
    config: PipelineConfig,
    mode: GenerationMode,
    reprojector: Reprojector,
    state: Arc<SessionState>,
    last_camera: Option<CameraState>,
}

impl PointCloudBuilder {
    pub fn new(config: PipelineConfig, mode: GenerationMode, state: Arc<SessionState>) -> Self {
        Self {
            reprojector: Reprojector::new(config.orientation),
            config,
            mode,
            state,
            last_camera: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Most recent camera state seen on any event.
    pub fn last_camera(&self) -> Option<CameraState> {
        self.last_camera
    }

    /// Record the event's camera state, if it carries one.
    pub fn track(&mut self, event: &SensorFrameEvent<'_>) {
        if let Some(camera) = event.camera() {
            self.last_camera = Some(camera);
        }
    }

    /// Process one event. Returns the batches to emit; usually none or one,
    /// but a mesh event with several anchors may yield more.
    pub fn handle_event(&mut self, event: SensorFrameEvent<'_>, now: Instant) -> Vec<PointBatch> {
        self.track(&event);

        match (self.mode, event) {
            (GenerationMode::DepthMapDriven, SensorFrameEvent::DepthUpdate(update)) => {
                self.build_from_depth(&update, now).into_iter().collect()
            }
            (GenerationMode::MeshDriven, SensorFrameEvent::MeshAnchorUpdate(update)) => {
                self.build_from_mesh(&update, now)
            }
            _ => Vec::new(),
        }
    }

    fn gate(&self, now: Instant) -> bool {
        self.state.sink().is_some() && self.state.try_begin_emit(now)
    }

    fn build_from_depth(&self, update: &DepthUpdate<'_>, now: Instant) -> Option<PointBatch> {
        if !self.gate(now) {
            trace!("Skipping depth frame at {:.3}s", update.timestamp);
            return None;
        }
        let Some(depth) = update.depth() else {
            trace!("Depth frame at {:.3}s carries no depth map", update.timestamp);
            return None;
        };

        let camera = update.camera;
        let (width, height) = (depth.width(), depth.height());
        let intrinsics = match (&update.color, self.config.rescale_depth_intrinsics) {
            (Some(color), true) => {
                let (cw, ch) = color.dimensions();
                camera
                    .intrinsics
                    .rescaled((cw as u32, ch as u32), (width as u32, height as u32))
            }
            _ => camera.intrinsics,
        };
        let target = self.color_target(Some(camera), update.color);

        let step = self.config.stride_for_width(width);
        let mut batch =
            PointBatch::with_capacity(width.div_ceil(step) * height.div_ceil(step), update.timestamp);

        for py in (0..height).step_by(step) {
            for px in (0..width).step_by(step) {
                let Some(d) = depth.get(px, py) else {
                    continue;
                };
                if !self.config.is_valid_depth(d) {
                    continue;
                }
                let world = unproject_depth_pixel(px as f32, py as f32, d, &intrinsics, &camera.pose);
                if !world.is_finite() {
                    continue;
                }
                batch.push(PointRecord::new(world, self.fuse_color(world, target.as_ref())));
            }
        }

        if batch.is_empty() {
            trace!("Depth frame at {:.3}s produced no valid points", update.timestamp);
            return None;
        }
        debug!(
            "Built {} points from {}x{} depth (step {}) at {:.3}s",
            batch.len(),
            width,
            height,
            step,
            update.timestamp
        );
        Some(batch)
    }

    fn build_from_mesh(&self, update: &MeshAnchorUpdate<'_>, now: Instant) -> Vec<PointBatch> {
        // Projection is set up once, after the first anchor passes the gates.
        let mut target = None;
        let mut batches = Vec::new();
        for anchor in update.anchors {
            if anchor.vertices.is_empty() {
                continue;
            }
            if !self.gate(now) {
                trace!("Skipping mesh anchor {} at {:.3}s", anchor.id, update.timestamp);
                continue;
            }
            let target = target.get_or_insert_with(|| {
                self.color_target(update.camera.or(self.last_camera), update.color)
            });
            if let Some(batch) = self.build_from_anchor(anchor, target.as_ref(), update.timestamp) {
                batches.push(batch);
            }
        }
        batches
    }

    fn build_from_anchor(
        &self,
        anchor: &MeshAnchor<'_>,
        target: Option<&(ProjectionView, ColorFrame<'_>)>,
        timestamp: f64,
    ) -> Option<PointBatch> {
        let mut batch = PointBatch::with_capacity(anchor.vertices.len(), timestamp);
        for local in anchor.vertices.iter() {
            let world = unproject_mesh_vertex(local, &anchor.transform);
            if !world.is_finite() {
                continue;
            }
            batch.push(PointRecord::new(world, self.fuse_color(world, target)));
        }

        if batch.is_empty() {
            return None;
        }
        debug!(
            "Built {} points from mesh anchor {} at {:.3}s",
            batch.len(),
            anchor.id,
            timestamp
        );
        Some(batch)
    }

    /// Projection into `color` for this batch, if color fusion can run at all.
    fn color_target<'a>(
        &self,
        camera: Option<CameraState>,
        color: Option<ColorFrame<'a>>,
    ) -> Option<(ProjectionView, ColorFrame<'a>)> {
        if !self.config.enable_color_fusion {
            return None;
        }
        let (camera, color) = (camera?, color?);
        let (width, height) = color.dimensions();
        let view = self.reprojector.view(&camera, width, height)?;
        Some((view, color))
    }

    fn fuse_color(&self, world: Vec3, target: Option<&(ProjectionView, ColorFrame<'_>)>) -> Vec3 {
        target
            .and_then(|(view, frame)| {
                let (px, py) = view.project(world)?;
                color::sample(px, py, frame)
            })
            .unwrap_or_else(|| self.config.fallback_color().clamp(Vec3::ZERO, Vec3::ONE))
    }
}

impl std::fmt::Debug for PointCloudBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointCloudBuilder")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("last_camera", &self.last_camera)
            .finish_non_exhaustive()
    }
}
