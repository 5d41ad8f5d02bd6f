//! Database seeding functionality
//!
//! Populates the rows the service needs before anyone can log in.

pub mod admin;

pub use admin::seed_bootstrap_admin;
