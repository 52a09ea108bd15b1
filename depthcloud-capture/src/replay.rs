//! Deterministic synthetic depth device.
//!
//! Renders a tilted plane in front of a camera that orbits slowly around the
//! origin. Each frame yields a depth map, an NV12 color image from a
//! [`CaptureSource`], and periodically a set of mesh anchors tiling the same
//! plane. Geometry is exact, so unprojected points land on the plane.

use crate::nv12::Nv12Image;
use crate::source::{CaptureError, CaptureSource, FrameData};
use depthcloud_data::{CameraState, DepthFrame, Intrinsics, MeshAnchor, MeshVertexBuffer, Pose};
use depthcloud_fusion::ingest::{
    Capabilities, DepthUpdate, MeshAnchorUpdate, PoseUpdate, SceneReconstruction,
    SensorFrameEvent, SensorStream, SessionConfiguration, StreamError, TrackingControl,
};
use glam::{Quat, Vec3};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Stride of the synthetic vertex buffer: xyz plus one float of padding.
const VERTEX_STRIDE: usize = 16;

/// Synthetic device settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub depth_width: usize,
    pub depth_height: usize,
    pub color_width: u32,
    pub color_height: u32,
    /// Focal length in pixels at the color resolution.
    pub focal_length: f32,
    pub capabilities: Capabilities,
    pub fps: f32,
    /// Total frames before the stream ends.
    pub frames: u64,
    /// Sleep between frames to simulate a live sensor.
    pub realtime: bool,
    /// Distance from the origin to the plane along -z, meters.
    pub plane_distance: f32,
    /// Rotation of the plane about the x axis, radians.
    pub plane_tilt: f32,
    pub orbit_radius: f32,
    /// Emit mesh anchors every this many frames.
    pub mesh_interval: u64,
    pub anchor_count: usize,
    /// Vertices per side of each anchor's grid.
    pub anchor_grid: usize,
    /// Side length of each anchor's patch, meters.
    pub anchor_size: f32,
    /// Every Nth depth pixel reads NaN. Zero disables dropouts.
    pub invalid_every: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            depth_width: 256,
            depth_height: 192,
            color_width: 640,
            color_height: 480,
            focal_length: 500.0,
            capabilities: Capabilities::full(),
            fps: 30.0,
            frames: 300,
            realtime: true,
            plane_distance: 1.5,
            plane_tilt: 0.3,
            orbit_radius: 0.2,
            mesh_interval: 10,
            anchor_count: 2,
            anchor_grid: 8,
            anchor_size: 0.5,
            invalid_every: 7,
        }
    }
}

impl ReplayConfig {
    /// Intrinsics at the color resolution, principal point at the center.
    pub fn intrinsics(&self) -> Intrinsics {
        Intrinsics::new(
            self.focal_length,
            self.focal_length,
            self.color_width as f32 / 2.0,
            self.color_height as f32 / 2.0,
        )
    }

    /// Intrinsics rescaled to the depth grid.
    pub fn depth_intrinsics(&self) -> Intrinsics {
        self.intrinsics().rescaled(
            (self.color_width, self.color_height),
            (self.depth_width as u32, self.depth_height as u32),
        )
    }

    fn validate(&self) -> Result<(), CaptureError> {
        if self.depth_width == 0 || self.depth_height == 0 {
            return Err(CaptureError::InvalidConfig("depth grid is empty".to_string()));
        }
        if self.color_width == 0 || self.color_height == 0 {
            return Err(CaptureError::InvalidConfig("color image is empty".to_string()));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(CaptureError::InvalidConfig(format!("fps must be positive, got {}", self.fps)));
        }
        if !(self.focal_length.is_finite() && self.focal_length > 0.0) {
            return Err(CaptureError::InvalidConfig(format!(
                "focal length must be positive, got {}",
                self.focal_length
            )));
        }
        Ok(())
    }
}

/// Shared tracking state, driven from the control thread.
#[derive(Debug, Default)]
pub struct ReplayControl {
    configuration: Mutex<Option<SessionConfiguration>>,
    reset_requested: AtomicBool,
}

impl ReplayControl {
    pub fn configuration(&self) -> Option<SessionConfiguration> {
        *self
            .configuration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.configuration().is_some()
    }

    fn take_reset(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }
}

impl TrackingControl for ReplayControl {
    fn run(&self, configuration: &SessionConfiguration) {
        *self
            .configuration
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(*configuration);
        info!("Replay tracking running: {:?}", configuration);
    }

    fn reset_tracking(&self) {
        self.reset_requested.store(true, Ordering::Release);
        info!("Replay tracking reset requested");
    }
}

/// Color source producing a moving RGB gradient.
#[derive(Debug, Clone)]
pub struct GradientSource {
    width: u32,
    height: u32,
    fps: f32,
    frame_count: u64,
    active: bool,
}

impl GradientSource {
    pub fn new(width: u32, height: u32, fps: f32) -> Self {
        Self {
            width,
            height,
            fps,
            frame_count: 0,
            active: true,
        }
    }
}

impl CaptureSource for GradientSource {
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
        if !self.active {
            return Ok(None);
        }
        let (w, h) = (self.width.max(1), self.height.max(1));
        let blue = (self.frame_count % 256) as u8;
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([(x * 255 / w) as u8, (y * 255 / h) as u8, blue])
        });
        let timestamp = self.frame_count as f64 / self.fps as f64;
        self.frame_count += 1;
        Ok(Some(FrameData::new(image, timestamp, self.frame_count)))
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.fps)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) {
        self.active = false;
    }
}

/// A synthetic device implementing [`SensorStream`].
pub struct ReplayDevice<S: CaptureSource = GradientSource> {
    config: ReplayConfig,
    source: S,
    control: Arc<ReplayControl>,
    frame: u64,
    /// Frames since the last tracking reset; drives the orbit.
    tracked_frames: u64,
    /// Bumped on every reset so anchor ids change, as new anchors would.
    anchor_generation: u64,
    depth: Vec<f32>,
    vertices: Vec<[f32; 4]>,
}

impl ReplayDevice<GradientSource> {
    /// Create a device with a gradient color source. Tracking starts idle;
    /// call [`TrackingControl::run`] on the returned control first.
    pub fn new(config: ReplayConfig) -> Result<(Self, Arc<ReplayControl>), CaptureError> {
        let source = GradientSource::new(config.color_width, config.color_height, config.fps);
        Self::with_source(config, source)
    }
}

impl<S: CaptureSource> ReplayDevice<S> {
    pub fn with_source(
        mut config: ReplayConfig,
        source: S,
    ) -> Result<(Self, Arc<ReplayControl>), CaptureError> {
        (config.color_width, config.color_height) = source.resolution();
        config.validate()?;

        info!(
            "Replay device: depth {}x{}, color {}x{}, {} frames at {} fps",
            config.depth_width,
            config.depth_height,
            config.color_width,
            config.color_height,
            config.frames,
            config.fps
        );

        let control = Arc::new(ReplayControl::default());
        let device = Self {
            depth: vec![f32::NAN; config.depth_width * config.depth_height],
            vertices: Vec::new(),
            config,
            source,
            control: control.clone(),
            frame: 0,
            tracked_frames: 0,
            anchor_generation: 0,
        };
        Ok((device, control))
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn control(&self) -> &Arc<ReplayControl> {
        &self.control
    }

    /// Frames delivered so far.
    pub fn frames_emitted(&self) -> u64 {
        self.frame
    }

    /// The source must deliver frames at its advertised resolution, in order.
    fn check_frame(&self, color: &FrameData) -> Result<(), CaptureError> {
        let expected = (self.config.color_width, self.config.color_height);
        if color.dimensions() != expected {
            let (w, h) = color.dimensions();
            return Err(CaptureError::UnsupportedFormat(format!(
                "{}x{} color frame from a {}x{} source",
                w, h, expected.0, expected.1
            )));
        }
        if color.frame_number != self.frame + 1 {
            return Err(CaptureError::CaptureFailed(format!(
                "expected color frame {}, source delivered {}",
                self.frame + 1,
                color.frame_number
            )));
        }
        Ok(())
    }

    /// Camera pose for the current tracked frame: a slow orbit in the xy plane,
    /// yawing slightly to keep the plane centered.
    fn pose(&self) -> Pose {
        let t = self.tracked_frames as f32 / self.config.fps;
        let angle = t * 0.5;
        let translation =
            Vec3::new(angle.cos() - 1.0, angle.sin(), 0.0) * self.config.orbit_radius;
        let yaw = (-translation.x / self.config.plane_distance).atan();
        Pose::from_rotation_translation(Quat::from_rotation_y(yaw), translation)
    }

    fn plane(&self) -> (Vec3, Vec3) {
        let point = Vec3::new(0.0, 0.0, -self.config.plane_distance);
        let normal = Quat::from_rotation_x(self.config.plane_tilt) * Vec3::Z;
        (point, normal)
    }

    fn render_depth(&mut self, pose: &Pose) {
        let intrinsics = self.config.depth_intrinsics();
        let (plane_point, normal) = self.plane();
        let origin = pose.translation();
        let rotation = pose.matrix();
        let width = self.config.depth_width;

        for (i, depth) in self.depth.iter_mut().enumerate() {
            let (px, py) = ((i % width) as f32, (i / width) as f32);
            if self.config.invalid_every > 0 && i % self.config.invalid_every == 0 {
                *depth = f32::NAN;
                continue;
            }
            // Camera-space ray with unit depth along -z.
            let ray = Vec3::new(
                (px - intrinsics.cx) / intrinsics.fx,
                (py - intrinsics.cy) / intrinsics.fy,
                -1.0,
            );
            let direction = rotation.transform_vector3(ray);
            let denom = normal.dot(direction);
            let s = normal.dot(plane_point - origin) / denom;
            *depth = if s.is_finite() && s > 0.0 { s } else { f32::NAN };
        }
    }

    fn build_anchor_vertices(&mut self) {
        let grid = self.config.anchor_grid.max(2);
        let size = self.config.anchor_size;
        self.vertices.clear();
        for _ in 0..self.config.anchor_count {
            for j in 0..grid {
                for i in 0..grid {
                    let u = (i as f32 / (grid - 1) as f32 - 0.5) * size;
                    let v = (j as f32 / (grid - 1) as f32 - 0.5) * size;
                    self.vertices.push([u, v, 0.0, 0.0]);
                }
            }
        }
    }

    fn anchor_transforms(&self) -> Vec<Pose> {
        let (plane_point, _) = self.plane();
        let rotation = Quat::from_rotation_x(self.config.plane_tilt);
        let count = self.config.anchor_count;
        (0..count)
            .map(|k| {
                let offset = (k as f32 - (count as f32 - 1.0) / 2.0) * self.config.anchor_size;
                Pose::from_rotation_translation(
                    rotation,
                    plane_point + rotation * Vec3::new(offset, 0.0, 0.0),
                )
            })
            .collect()
    }

    fn emit_frame(
        &mut self,
        configuration: &SessionConfiguration,
        color: &FrameData,
        handler: &mut dyn FnMut(SensorFrameEvent<'_>),
    ) -> Result<(), StreamError> {
        let pose = self.pose();
        let camera = CameraState::new(pose, self.config.intrinsics());
        let timestamp = self.frame as f64 / self.config.fps as f64;
        let nv12 = Nv12Image::from_rgb(&color.image);
        let color_frame = nv12.as_frame()?;

        if configuration.scene_depth {
            self.render_depth(&pose);
            let depth =
                DepthFrame::new(&self.depth, self.config.depth_width, self.config.depth_height)?;
            let update = DepthUpdate::new(timestamp, camera).with_color(color_frame);
            let update = if configuration.smoothed_scene_depth {
                update.with_smoothed_depth(depth)
            } else {
                update.with_raw_depth(depth)
            };
            handler(SensorFrameEvent::DepthUpdate(update));
        } else {
            handler(SensorFrameEvent::PoseUpdate(PoseUpdate::new(timestamp, camera)));
        }

        let mesh_due = self.config.mesh_interval > 0
            && self.tracked_frames % self.config.mesh_interval == 0;
        if configuration.scene_reconstruction != SceneReconstruction::None && mesh_due {
            if self.vertices.is_empty() {
                self.build_anchor_vertices();
            }
            let per_anchor = self.vertices.len() / self.config.anchor_count.max(1);
            let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
            let mut anchors = Vec::with_capacity(self.config.anchor_count);
            for (k, transform) in self.anchor_transforms().into_iter().enumerate() {
                let buffer = MeshVertexBuffer::new(
                    bytes,
                    per_anchor,
                    VERTEX_STRIDE,
                    k * per_anchor * VERTEX_STRIDE,
                )?;
                let id = self.anchor_generation * 1000 + k as u64;
                anchors.push(MeshAnchor::new(id, transform, buffer));
            }

            debug!("Replay frame {}: {} mesh anchors", self.frame, anchors.len());
            handler(SensorFrameEvent::MeshAnchorUpdate(
                MeshAnchorUpdate::new(timestamp, &anchors)
                    .with_camera(camera)
                    .with_color(color_frame),
            ));
        }
        Ok(())
    }
}

impl<S: CaptureSource> SensorStream for ReplayDevice<S> {
    fn next_event(
        &mut self,
        handler: &mut dyn FnMut(SensorFrameEvent<'_>),
    ) -> Result<bool, StreamError> {
        if self.frame >= self.config.frames {
            return Ok(false);
        }
        let Some(configuration) = self.control.configuration() else {
            return Err(StreamError::NotRunning);
        };
        if self.control.take_reset() {
            self.tracked_frames = 0;
            self.anchor_generation += 1;
            self.vertices.clear();
            info!("Replay tracking restarted, anchors dropped");
        }

        let Some(color) = self.source.next_frame()? else {
            info!("Color source exhausted after {} frames", self.frame);
            return Ok(false);
        };
        self.check_frame(&color)?;
        self.emit_frame(&configuration, &color, handler)?;

        self.frame += 1;
        self.tracked_frames += 1;
        if self.frame >= self.config.frames {
            self.source.stop();
            info!("Replay finished after {} frames", self.frame);
            return Ok(false);
        }
        if self.config.realtime {
            std::thread::sleep(Duration::from_secs_f32(1.0 / self.config.fps));
        }
        Ok(true)
    }

    fn capabilities(&self) -> Capabilities {
        self.config.capabilities
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.config.fps)
    }

    fn is_active(&self) -> bool {
        self.frame < self.config.frames && self.control.is_running() && self.source.is_active()
    }
}
