#![forbid(unsafe_code)]

//! Core domain model and business logic for the dose journal.
//!
//! This crate provides:
//! - Domain types (injections, wellness observations, reminders)
//! - Adherence and trend engine (next dose, streak, weight trend, timeline)
//! - Calendar views and reminder scheduling
//! - Persistence (locked JSON collections) and export (CSV, JSON)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod engine;
pub mod history;
pub mod reminder;
pub mod store;
pub mod journal;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use engine::{
    adherence_streak, merge_timeline, next_injection_date, weight_change, NextDoseStatus,
    TimelinePoint, WeightChange, WeightTrend,
};
pub use store::{Collection, CollectionStore, JsonFileStore, MemoryStore};
pub use journal::{Journal, Snapshot};
pub use export::ExportBundle;
