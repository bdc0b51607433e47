//! Real-time sync layer for the Sportisode client.
//!
//! Keeps per-channel WebSocket connections alive (fixed-delay reconnect,
//! heartbeat), routes inbound frames into one shared [`Store`], and applies
//! optimistic relation toggles with exact rollback.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod store;
pub mod transport;

pub use client::SyncClient;
pub use config::Config;
pub use error::{SyncError, SyncResult};
pub use repositories::RestApi;
pub use services::{ChannelHandle, ConnectionManager, Dispatcher, OptimisticCoordinator};
pub use store::Store;
