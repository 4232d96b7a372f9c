//! # Engine Error Types
//!
//! All errors that can occur while configuring or driving a simulation.
//! Per-frame physics never fails; errors come from setup and lifecycle.

use thiserror::Error;

use crate::particle::ParticleId;

/// Errors that can occur in the particle engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A TOML configuration file failed to parse.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned particle carried NaN or infinite state.
    #[error("non-finite particle state: {0}")]
    NonFinite(&'static str),

    /// No particle with this id exists.
    #[error("unknown particle: {0}")]
    UnknownParticle(ParticleId),

    /// The session was stopped and cannot run again.
    #[error("session stopped")]
    SessionStopped,

    /// The session has not been started.
    #[error("session not running")]
    SessionNotRunning,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
