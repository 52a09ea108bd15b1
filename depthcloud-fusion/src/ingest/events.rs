//! Sensor events delivered to the pipeline.
//!
//! Events borrow the sensor layer's buffers. They are handed to a handler
//! synchronously and must not outlive that call; anything the pipeline keeps
//! (the camera state) is copied out.

use depthcloud_data::{CameraState, ColorFrame, DepthFrame, MeshAnchor};

/// A single sensor callback.
#[derive(Debug, Clone, Copy)]
pub enum SensorFrameEvent<'a> {
    /// A camera frame, possibly carrying depth and a color image.
    DepthUpdate(DepthUpdate<'a>),
    /// One or more mesh anchors were added or updated.
    MeshAnchorUpdate(MeshAnchorUpdate<'a>),
    /// Tracking produced a new camera pose without image data.
    PoseUpdate(PoseUpdate),
}

impl SensorFrameEvent<'_> {
    /// Sensor timestamp in seconds.
    pub fn timestamp(&self) -> f64 {
        match self {
            Self::DepthUpdate(update) => update.timestamp,
            Self::MeshAnchorUpdate(update) => update.timestamp,
            Self::PoseUpdate(update) => update.timestamp,
        }
    }

    /// Camera state carried by the event, if any.
    pub fn camera(&self) -> Option<CameraState> {
        match self {
            Self::DepthUpdate(update) => Some(update.camera),
            Self::MeshAnchorUpdate(update) => update.camera,
            Self::PoseUpdate(update) => Some(update.camera),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::DepthUpdate(_) => "depth",
            Self::MeshAnchorUpdate(_) => "mesh",
            Self::PoseUpdate(_) => "pose",
        }
    }
}

/// Camera frame with optional depth maps and color image.
#[derive(Debug, Clone, Copy)]
pub struct DepthUpdate<'a> {
    pub timestamp: f64,
    pub camera: CameraState,
    /// Temporally smoothed depth, when the device provides it.
    pub smoothed_depth: Option<DepthFrame<'a>>,
    pub raw_depth: Option<DepthFrame<'a>>,
    pub color: Option<ColorFrame<'a>>,
}

impl<'a> DepthUpdate<'a> {
    pub fn new(timestamp: f64, camera: CameraState) -> Self {
        Self {
            timestamp,
            camera,
            smoothed_depth: None,
            raw_depth: None,
            color: None,
        }
    }

    pub fn with_raw_depth(mut self, depth: DepthFrame<'a>) -> Self {
        self.raw_depth = Some(depth);
        self
    }

    pub fn with_smoothed_depth(mut self, depth: DepthFrame<'a>) -> Self {
        self.smoothed_depth = Some(depth);
        self
    }

    pub fn with_color(mut self, color: ColorFrame<'a>) -> Self {
        self.color = Some(color);
        self
    }

    /// Smoothed depth if present, else raw depth.
    pub fn depth(&self) -> Option<&DepthFrame<'a>> {
        self.smoothed_depth.as_ref().or(self.raw_depth.as_ref())
    }
}

/// Mesh anchors added or updated in one callback, with the current camera
/// frame when the tracking layer has one.
#[derive(Debug, Clone, Copy)]
pub struct MeshAnchorUpdate<'a> {
    pub timestamp: f64,
    pub anchors: &'a [MeshAnchor<'a>],
    /// Camera state of the current frame; the last known state is used if absent.
    pub camera: Option<CameraState>,
    pub color: Option<ColorFrame<'a>>,
}

impl<'a> MeshAnchorUpdate<'a> {
    pub fn new(timestamp: f64, anchors: &'a [MeshAnchor<'a>]) -> Self {
        Self {
            timestamp,
            anchors,
            camera: None,
            color: None,
        }
    }

    pub fn with_camera(mut self, camera: CameraState) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_color(mut self, color: ColorFrame<'a>) -> Self {
        self.color = Some(color);
        self
    }
}

/// Camera pose and intrinsics without image data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseUpdate {
    pub timestamp: f64,
    pub camera: CameraState,
}

impl PoseUpdate {
    pub fn new(timestamp: f64, camera: CameraState) -> Self {
        Self { timestamp, camera }
    }
}
