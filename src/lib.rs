//! # MotorGuard API Library
//!
//! Core of the MotorGuard service: configuration, persistence, the two
//! authentication schemes, the authorization policy and the HTTP surface for
//! motors, telemetry, maintenance, safety thresholds and sensor devices.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod seeds;
pub mod server;
pub use migration;
