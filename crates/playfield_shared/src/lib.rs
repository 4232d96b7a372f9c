//! # PLAYFIELD Shared
//!
//! Common types used by the particle engine and the HTTP server.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER do I/O. It holds:
//! - `math`: the 2D vector used for every particle quantity
//! - `constants`: named defaults for every tuning value
//! - `api`: JSON wire types for the HTTP API

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod constants;
pub mod math;

pub use api::{
    ErrorBody, LyricsRequest, LyricsResponse, NewSubmission, Submission, SyncedLine,
};
pub use math::Vec2;
