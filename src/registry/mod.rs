//! Registry module for Docker registry interactions
//!
//! This module provides the HTTP client used to read tags and manifests from
//! registries speaking the Docker Registry HTTP API v2 / OCI Distribution API,
//! including the anonymous and credentialed token flows.

pub mod auth;
pub mod client;

pub use crate::config::AuthConfig;
pub use auth::{Auth, AuthChallenge};
pub use client::{RegistryClient, RegistryClientBuilder};
