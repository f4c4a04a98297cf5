//! # Crossing Logs
//!
//! Ingestion and classification engine for per-day vehicle crossing logs.
//!
//! Capture stations write one CSV log per session into
//! `<root>/<Entry|Exit>/<DD-MM-YYYY>/`, next to folders of captured images
//! whose naming has changed over time. This crate turns such a tree into a
//! normalized, deterministically ordered record table, tags every record with
//! its crossing direction and day/night shift, links each record to its
//! image, and derives daily counts and first/last events.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │  Walker  │──▶│  Parser  │──▶│  Classify  │──▶│  Images  │
//! │ mode/date│   │ CSV rows │   │ day/night  │   │ fallback │
//! └──────────┘   └──────────┘   └────────────┘   └────┬─────┘
//!                                                     ▼
//!                         ┌───────────┐       ┌──────────────┐
//!                         │ Aggregate │◀──────│ record table │
//!                         └───────────┘       └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crossings --root ./Logs sources        # folders and their health
//! crossings --root ./Logs ingest         # counts and skipped inputs
//! crossings --root ./Logs counts --mode entry
//! crossings --root ./Logs export --output out/crossings.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and the output contract |
//! | [`walker`] | Mode and date folder discovery |
//! | [`parser`] | Session file listing and CSV decoding |
//! | [`classify`] | Day/night classification |
//! | [`images`] | Image directory fallback search |
//! | [`ingest`] | Pipeline orchestration |
//! | [`aggregate`] | Daily counts and first/last events |
//! | [`filter`] | Date, time-of-day, and mode filters |
//! | [`selection`] | Caller-owned record selection and image lookup |
//! | [`cache`] | Fingerprint-keyed ingestion cache |
//! | [`export`] | JSON and CSV export |

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod config;
pub mod export;
pub mod filter;
pub mod images;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod progress;
pub mod report;
pub mod selection;
pub mod sources;
pub mod walker;
