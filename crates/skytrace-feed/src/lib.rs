//! Skytrace feed - where aircraft positions come from.
//!
//! Handles communication with the remote state-vector feed (with optional
//! OAuth2 client credentials) and the static fallback capture, and exposes
//! both through the [`PositionSource`] trait the tracker consumes.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod source;

pub use auth::TokenManager;
pub use client::FeedClient;
pub use config::{FeedConfig, OAuthCredentials};
pub use error::{AuthError, FallbackError, FeedError};
pub use fallback::FallbackDataset;
pub use source::{OpenSkySource, PositionSource};
