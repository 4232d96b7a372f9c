//! # PLAYFIELD
//!
//! Interactive page effects built on a small 2D particle engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              PLAYFIELD                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │ playfield_shared│────>│ playfield_engine│────>│ playfield       │   │
//! │  │                 │     │                 │     │                 │   │
//! │  │  • Vec2         │     │  • Simulation   │     │  • FrameLoop    │   │
//! │  │  • Constants    │     │  • Session      │     │  • playfield_sim│   │
//! │  │  • API types    │     │  • Presets      │     │                 │   │
//! │  └────────┬────────┘     └─────────────────┘     └─────────────────┘   │
//! │           │                                                             │
//! │           │              ┌─────────────────┐                           │
//! │           └─────────────>│ playfield_server│                           │
//! │                          │  • Lyrics       │                           │
//! │                          │  • Submissions  │                           │
//! │                          └─────────────────┘                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `frame_loop`: Frame pacing and timing

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod frame_loop;

pub use playfield_engine as engine;
pub use playfield_shared as shared;

pub use frame_loop::{ClockMode, FrameLoop, FrameLoopConfig, FrameStats, FrameStatsAccumulator};
pub use playfield_engine::{
    EngineConfig, EngineError, EngineResult, FrameReport, FrameView, InstanceBuffer, Preset,
    RenderAdapter, Session, Simulation, Space, Spawn, Vec2,
};
