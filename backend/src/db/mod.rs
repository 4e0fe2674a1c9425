//! Timetable storage.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Pipeline / HTTP handlers                               │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                            │
//! │  - user id sanitation                                   │
//! │  - deadline-bounded store calls                         │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  TimetableRepository trait (repository/)                │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────▼──────────────────────────────┐
//!     │             Local Repository                  │
//!     │               (in-memory)                     │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! The store handle is always passed explicitly as an
//! `Arc<dyn TimetableRepository>`; there is no process-wide instance.

pub mod repositories;
pub mod repository;
pub mod services;

pub use repositories::LocalRepository;
pub use repository::{ErrorContext, RepositoryError, RepositoryResult, TimetableRepository};
pub use services::{
    bounded, get_timetable, health_check, list_timetables, purge_timetables, sanitize_user_id,
    timetables_by_group,
};
