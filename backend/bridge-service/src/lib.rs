//! Bridge recommendation and trust engine.
//!
//! Classifies community content by trust tier, infers member interests,
//! scores local groups, events and activities, and keeps the lifecycle of
//! the recommendations it produces.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, Result};
