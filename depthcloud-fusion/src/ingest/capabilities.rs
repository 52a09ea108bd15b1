//! Device capabilities and the tracking configuration derived from them.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What the sensor-tracking layer on this device can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub world_tracking: bool,
    pub mesh_reconstruction: bool,
    pub classified_mesh_reconstruction: bool,
    pub scene_depth: bool,
    pub smoothed_scene_depth: bool,
}

impl Capabilities {
    /// A device with a depth sensor and scene reconstruction.
    pub fn full() -> Self {
        Self {
            world_tracking: true,
            mesh_reconstruction: true,
            classified_mesh_reconstruction: true,
            scene_depth: true,
            smoothed_scene_depth: true,
        }
    }

    /// A device with a depth sensor but no scene reconstruction.
    pub fn depth_only() -> Self {
        Self {
            world_tracking: true,
            scene_depth: true,
            smoothed_scene_depth: true,
            ..Self::default()
        }
    }
}

/// Scene reconstruction level requested from the tracking layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneReconstruction {
    #[default]
    None,
    Mesh,
    MeshWithClassification,
}

/// Tracking configuration requested from the sensor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub plane_detection: bool,
    pub environment_texturing: bool,
    pub scene_reconstruction: SceneReconstruction,
    pub scene_depth: bool,
    pub smoothed_scene_depth: bool,
}

impl SessionConfiguration {
    /// Request everything the device supports. Returns `None` if the device
    /// cannot run world tracking at all.
    #[tracing::instrument(level = "debug")]
    pub fn from_capabilities(capabilities: &Capabilities) -> Option<Self> {
        if !capabilities.world_tracking {
            warn!("World tracking is not supported on this device");
            return None;
        }

        let scene_reconstruction = if capabilities.classified_mesh_reconstruction {
            SceneReconstruction::MeshWithClassification
        } else if capabilities.mesh_reconstruction {
            SceneReconstruction::Mesh
        } else {
            SceneReconstruction::None
        };

        Some(Self {
            plane_detection: true,
            environment_texturing: true,
            scene_reconstruction,
            scene_depth: capabilities.scene_depth,
            smoothed_scene_depth: capabilities.scene_depth && capabilities.smoothed_scene_depth,
        })
    }

    /// Point generation mode for this configuration, selected once per session.
    pub fn generation_mode(&self) -> Option<GenerationMode> {
        let mode = if self.scene_reconstruction != SceneReconstruction::None {
            Some(GenerationMode::MeshDriven)
        } else if self.scene_depth {
            Some(GenerationMode::DepthMapDriven)
        } else {
            None
        };
        match mode {
            Some(mode) => info!("Point generation mode: {:?}", mode),
            None => warn!("Neither scene reconstruction nor scene depth available"),
        }
        mode
    }
}

/// How points are generated for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One batch per mesh anchor add/update event.
    MeshDriven,
    /// One batch per camera frame, from the depth map.
    DepthMapDriven,
}
