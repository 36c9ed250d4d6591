//! rollcall-node - attendance bridge nodes.
//!
//! This crate provides two independent processes built on
//! [rollcall-core](../rollcall_core/index.html):
//!
//! - `attendance_publisher` polls the statistics endpoint on a timer and
//!   publishes a summary on `attendance_statistics`.
//! - `face_detection` reads camera frames, posts the first detected face
//!   to the identification endpoint and publishes matches on
//!   `attendance_events`.
//!
//! # Configuration
//!
//! Both binaries read an optional YAML file passed with `--config`.
//! See `config/rollcall.yaml` for every key and its default.
//!
//! # Transport
//!
//! Published messages are written to stdout as JSON lines
//! `{"topic": .., "data": ..}`. Camera frames are read from the
//! directory named by `face_detection.frame_source.directory`. Logs go
//! to stderr.

pub mod cli;
pub mod config;
pub mod frames;

pub use config::Config;
pub use frames::DirectorySource;
