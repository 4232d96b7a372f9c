//! # PLAYFIELD Server
//!
//! The site's HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌────────────────────────┐
//! │ TcpListener  │───>│ http codec   │───>│ routes                 │
//! │ (tokio)      │    │ (HTTP/1.1)   │    │  ├─ LyricsProvider ──> upstream
//! └──────────────┘    └──────────────┘    │  └─ SubmissionStore    │
//!                                         └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML server configuration
//! - `http`: request/response codec
//! - `lyrics`: lyrics providers and LRC parsing
//! - `store`: submission storage and validation
//! - `routes`: request dispatch
//! - `server`: accept loop

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod http;
pub mod lyrics;
pub mod routes;
pub mod server;
pub mod store;

pub use config::{LyricsConfig, ServerConfig};
pub use error::{ApiError, HttpError, LyricsError, ServerError, ServerResult};
pub use lyrics::{
    parse_lrc, ConfiguredProvider, DisabledLyricsProvider, HttpLyricsProvider, LyricsProvider,
};
pub use routes::AppState;
pub use server::Server;
pub use store::{InMemoryStore, SubmissionStore};
