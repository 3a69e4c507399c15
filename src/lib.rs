// src/lib.rs

//! Ad Rotator Library
//!
//! Loads promotional ad records from a prioritized chain of sources, drops
//! expired ones and rotates them through a display region on a fixed
//! interval, pausing while the pointer hovers and counting clicks.

pub mod display;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod rotator;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{AppError, Result};
pub use rotator::{AdRotator, RotatorHandle};
