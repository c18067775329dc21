//! Time-windowed, idempotent pipeline run tracking.
//!
//! Each pipeline/config pair owns a contiguous run of fixed-length query windows,
//! one [`TrackingRecord`] per window. [`run_gap_fill`] extends that run up to the
//! freshness boundary without ever duplicating a window, and [`get_next_n`] hands
//! the oldest PENDING records to whoever executes the pipeline.
//!
//! The library never installs a `tracing` subscriber; callers do.
//!
//! ```no_run
//! use chrono::Utc;
//! use pipeline_tracker::{SqliteTrackingStore, db::migrate, get_next_n, load_config_path};
//!
//! let cfg = load_config_path("tracker.toml").unwrap();
//! let url = cfg.store.database_url().unwrap();
//! migrate::run_sqlite(&url).unwrap();
//!
//! let mut store = SqliteTrackingStore::open(&url).unwrap();
//! let settings = cfg.pipeline("orders_hourly").unwrap();
//! let batch = get_next_n(&mut store, &settings, Utc::now()).unwrap();
//! println!("{} new, {} pending", batch.new_records_created, batch.total_returned);
//! ```

#![deny(missing_docs)]

pub mod bootstrap;
pub mod bucket;
pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod gap_fill;
pub mod pending;
pub mod record;
/// Diesel table definitions.
#[allow(missing_docs)]
pub mod schema;
pub mod store;
pub mod time_context;
pub mod tz;
pub mod window;

pub use bootstrap::bootstrap_first_window;
pub use config::{PipelineSettings, TrackerConfig, load_config_path, load_config_str};
pub use duration::{Span, format_duration, parse_duration};
pub use error::{ErrorKind, Result, TrackerError};
pub use gap_fill::{GapFillFailure, GapFillOutcome, GapFillReport, NoOpReason, run_gap_fill};
pub use pending::{PendingBatch, PendingFetchError, get_next_n};
pub use record::{PipelinePhase, PipelineStatus, RecordUpdate, TrackingRecord};
pub use store::{RecordFilter, SqliteTrackingStore, TrackingStore};
pub use window::TimeWindow;
