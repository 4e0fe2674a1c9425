//! # Timetable ingest backend
//!
//! Turns uploaded timetable spreadsheets into per-user schedule entries.
//!
//! An upload goes through these steps:
//!
//! - **Parsing** ([`parsing`]): the workbook is spooled to a temporary file,
//!   its first sheet decoded with calamine and every cell normalized to text
//!   (dates as `yyyy-MM-dd`, times as `HH:mm`).
//! - **Screening** ([`services`]): rows become [`models::ScheduleEntry`]
//!   values, incomplete ones are rejected and repeats within the upload are
//!   dropped.
//! - **Persistence** ([`services`], [`db`]): surviving entries are probed
//!   against the user's stored entries and the new ones are written in one
//!   atomic batch.
//!
//! ## Modules
//!
//! - [`models`]: entry, key and summary types
//! - [`parsing`]: workbook reader, cell normalizer, row assembler
//! - [`db`]: repository trait, in-memory store, service layer
//! - [`services`]: dedup, commit, upload locks and the pipeline
//! - [`config`]: TOML + environment configuration
//! - [`http`]: axum server (feature `http-server`)

// RepositoryError carries context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod parsing;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use config::{ConfigError, IngestConfig, PipelineSettings, ServerSettings};
pub use error::{IngestError, IngestResult};
pub use services::IngestPipeline;
