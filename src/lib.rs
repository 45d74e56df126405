//! `AssetKit` daemon - local helper for the `AssetKit` add-on.
//!
//! The daemon sits between a GUI-hosted add-on and the remote asset
//! marketplace. The add-on fires commands at a loopback HTTP surface and
//! polls for results; the daemon runs the slow marketplace calls in the
//! background and records every step on a task.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   enqueue / poll   ┌─────────────┐
//! │   Add-on    │ ◄────────────────► │  Local API  │
//! └─────────────┘                    └──────┬──────┘
//!                                           │
//!                                    ┌──────┴──────┐
//!                                    │    Core     │
//!                                    │ tasks + registry
//!                                    │ + gateway   │
//!                                    └──────┬──────┘
//!                                           │ HTTPS
//!                                    ┌──────┴──────┐
//!                                    │ Marketplace │
//!                                    └─────────────┘
//! ```

pub mod api;
pub mod build_info;
pub mod cli;
pub mod config;
pub mod core;

pub use config::Config;
pub use core::{Gateway, GatewayError, Task, TaskRegistry, TaskStatus};
