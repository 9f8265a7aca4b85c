//! Common module - shared traits and interfaces
//!
//! The collector only talks to a registry through the traits defined here,
//! which keeps the traversal logic independent of HTTP.

pub mod traits;

pub use traits::*;
