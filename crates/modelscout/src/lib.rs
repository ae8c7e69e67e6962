//! Terminal client for a model-file scan service.
//!
//! The service walks a directory tree and reports checkpoint, LoRA, VAE and
//! similar model files. This crate sends the scan request, groups the reported
//! files by folder, filters them by name and renders the result in a terminal
//! UI or as plain text.

pub mod banner;
pub mod client;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod file_types;
pub mod format;
pub mod logging;
pub mod results;
pub mod settings;
pub mod ui;
