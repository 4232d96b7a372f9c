//! # PLAYFIELD Engine
//!
//! One generic 2D particle engine behind every physics toy on the site:
//! navigation bubbles, the ball pit, the roulette ball, the sand clock,
//! falling coins and settling petals.
//!
//! ## Frame Order
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌────────┐
//! │ drain pointer│──>│ integrate   │──>│ pairwise  │──>│ walls    │──>│ settle / │──>│ render │
//! │ events       │   │ (free only) │   │ circles   │   │ rect/rim │   │ retire   │   │ adapter│
//! └──────────────┘   └─────────────┘   └───────────┘   └──────────┘   └──────────┘   └────────┘
//! ```
//!
//! ## Modules
//!
//! - `particle`: particle state model
//! - `integrator`: semi-implicit Euler step
//! - `space`: simulation space and wall response
//! - `collision`: circle-circle response
//! - `settle`: settling policies
//! - `drag`: pointer grab and throw
//! - `deform`: cosmetic squash after impacts
//! - `render`: render adapter contract and instance packing
//! - `simulation`: the frame driver
//! - `session`: page lifetime and host resources
//! - `presets`: per-effect tuning

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod collision;
pub mod config;
pub mod deform;
pub mod drag;
pub mod error;
pub mod integrator;
pub mod particle;
pub mod presets;
pub mod render;
pub mod session;
pub mod settle;
pub mod simulation;
pub mod space;

pub use config::{DeformConfig, DragConfig, EngineConfig, PhysicsConfig, SettlePolicy};
pub use drag::{PointerEvent, PointerOutcome};
pub use error::{EngineError, EngineResult};
pub use particle::{Extent, Particle, ParticleId, ParticleState, Spawn};
pub use presets::Preset;
pub use render::{FrameView, InstanceBuffer, ParticleInstance, RenderAdapter};
pub use session::{HostResource, PointerSender, Session, SessionFrame, SessionState};
pub use simulation::{FrameEvent, FrameReport, Simulation};
pub use space::{Space, Wall, Walls};

pub use playfield_shared::Vec2;
