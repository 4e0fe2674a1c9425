//! Repository implementations module.
//!
//! - `local`: in-memory implementation for tests, development and the
//!   bundled server binary

pub mod local;

pub use local::LocalRepository;
