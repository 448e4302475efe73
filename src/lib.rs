//! Client for a remote Stable Diffusion backend
//!
//! A form controller collects a prompt and sampling parameters, submits
//! them through [`api::ImageBackend`], and tracks the outcome as an
//! explicit phase. The render surface writes accepted images to disk.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod payload;
pub mod render;

pub use error::{Error, Result};
