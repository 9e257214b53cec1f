// ==============================================================================
// config.rs — ESTIMATOR + SERVER CONFIGURATION (JSON)
// ------------------------------------------------------------------------------
// {
//   "model": "tire",
//   "link_name": "wheel",            // optional, first link of the model
//   "collision_name": "tread",       // required
//   "friction_static": 1.1,          // optional friction curve parameters
//   "friction_dynamic": 1.0,
//   "slip_static": 0.1,
//   "slip_dynamic": 0.2,
//   "speed_static": 1.0,
//   "tick_hz": 60,
//   "ws_addr": "0.0.0.0:9001"
// }
//
// Only name resolution can fail; friction parameters are repaired by
// FrictionParameters::from_settings().
// ==============================================================================

use std::path::Path;

use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
use serde::Deserialize;
use thiserror::Error;

use crate::physics::{Model, PhysicsWorld, scoped_name};
use crate::slip_friction::{ConfigOutOfRange, FrictionParameters, FrictionSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model [{0}] not found")]
    UnknownModel(String),

    #[error("model [{0}] has no links")]
    ModelHasNoLinks(String),

    #[error("link [{0}] not found")]
    UnknownLink(String),

    #[error("collision_name is required")]
    MissingCollision,

    #[error("collision [{collision}] not found on link [{link}]")]
    UnknownCollision { link: String, collision: String },
}

fn default_model() -> String {
    "tire".to_string()
}

fn default_tick_hz() -> u32 {
    60
}

fn default_ws_addr() -> String {
    "0.0.0.0:9001".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub link_name: Option<String>,
    #[serde(default)]
    pub collision_name: Option<String>,
    #[serde(flatten)]
    pub friction: FrictionSettings,
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    #[serde(default = "default_ws_addr")]
    pub ws_addr: String,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            link_name: None,
            collision_name: None,
            friction: FrictionSettings::default(),
            tick_hz: default_tick_hz(),
            ws_addr: default_ws_addr(),
        }
    }
}

/// The link and collision an estimator is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub link: String,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub collision: String, // scoped name
}

impl EstimatorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validated friction parameters plus the substitutions that were made.
    pub fn friction_parameters(&self) -> (FrictionParameters, Vec<ConfigOutOfRange>) {
        FrictionParameters::from_settings(&self.friction)
    }

    /// Resolve the configured model, link and collision in `world`.
    pub fn resolve_in(&self, world: &PhysicsWorld) -> Result<ResolvedTarget, ConfigError> {
        let model = world
            .model(&self.model)
            .ok_or_else(|| ConfigError::UnknownModel(self.model.clone()))?;
        self.resolve(model)
    }

    /// Resolve link and collision names against `model`.
    pub fn resolve(&self, model: &Model) -> Result<ResolvedTarget, ConfigError> {
        let link = match &self.link_name {
            Some(name) => model.link(name).ok_or_else(|| ConfigError::UnknownLink(name.clone()))?,
            None => model
                .first_link()
                .ok_or_else(|| ConfigError::ModelHasNoLinks(model.name.clone()))?,
        };

        let collision = self.collision_name.as_deref().ok_or(ConfigError::MissingCollision)?;
        let collider = link.collision(collision).ok_or_else(|| ConfigError::UnknownCollision {
            link: link.name.clone(),
            collision: collision.to_string(),
        })?;

        Ok(ResolvedTarget {
            link: link.name.clone(),
            body: link.body,
            collider,
            collision: scoped_name(&model.name, &link.name, collision),
        })
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }
}
