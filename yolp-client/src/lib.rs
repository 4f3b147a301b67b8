//! Yolp client library exports.
//!
//! The client keeps server data in one shared [`yolp_sync::KeyedCache`] and
//! layers navigation gating ([`guard`]) and user confirmations ([`confirm`])
//! on top of it. The `yolp` binary drives it from the command line.

use std::sync::Arc;
use yolp_core::RequestGateway;

pub mod api_client;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod error;
pub mod guard;
pub mod keys;
pub mod nav;
pub mod notifications;
pub mod queries;
pub mod session;
pub mod telemetry;
pub mod views;

/// Gateway handle shared by queries and commands.
pub type SharedGateway = Arc<dyn RequestGateway>;
