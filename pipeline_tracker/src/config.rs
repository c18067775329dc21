//! Tracker configuration: parsing, validation, and loading.
//!
//! A TOML file declares the tracking store and any number of pipelines:
//!
//! ```toml
//! [store]
//! database_url = "tracking.db"   # falls back to $DATABASE_URL
//! insert_batch_size = 500
//!
//! [pipelines.orders_hourly]
//! pipeline_name = "orders"
//! config_name = "orders_es_to_sf"
//! timezone = "UTC"
//! query_interval_window = "1h"
//! data_freshness_block_window = "0h"
//! max_pending_records = 10
//! ```
//!
//! Key behaviors:
//! - Every pipeline field is optional at the serde level so that a missing key
//!   surfaces as `MISSING_CONFIGURATION` naming the key, not as a TOML error.
//! - Names are trimmed; blank names are `INVALID_CONFIGURATION`.
//! - Pipelines keep their declaration order.
//! - Without a `fetch_filter` table the pending read is narrowed to the
//!   pipeline's own pair. An empty `fetch_filter` table reads every pipeline.
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]
//! - Validate one pipeline: [`PipelineConfig::resolve`]

use std::path::Path;

use chrono_tz::Tz;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shared_utils::env::explicit_or_env;

use crate::{
    duration::{Span, parse_duration},
    error::{Result, TrackerError},
    record::{PipelinePhase, RecordBuilder},
    store::{RecordFilter, sqlite::DEFAULT_INSERT_BATCH_SIZE},
    tz::parse_timezone,
};

/// Environment variable consulted when `[store].database_url` is absent.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Pipelines keyed by an operator-chosen name.
    #[serde(default)]
    pub pipelines: IndexMap<String, PipelineConfig>,
}

impl TrackerConfig {
    /// Resolves the pipeline declared under `key`.
    pub fn pipeline(&self, key: &str) -> Result<PipelineSettings> {
        self.pipelines
            .get(key)
            .ok_or_else(|| TrackerError::MissingConfiguration(format!("pipelines.{key}")))?
            .resolve()
    }

    /// Resolves every pipeline, in declaration order.
    pub fn resolve_all(&self) -> Result<Vec<(String, PipelineSettings)>> {
        self.pipelines
            .iter()
            .map(|(key, cfg)| cfg.resolve().map(|settings| (key.clone(), settings)))
            .collect()
    }
}

/// `[store]` table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite path or `sqlite:` URL.
    pub database_url: Option<String>,
    /// Rows per INSERT statement.
    pub insert_batch_size: Option<usize>,
}

impl StoreConfig {
    /// The configured database URL, else `$DATABASE_URL`.
    pub fn database_url(&self) -> Result<String> {
        Ok(explicit_or_env(self.database_url.as_deref(), DATABASE_URL_ENV)?)
    }

    /// Rows per INSERT; defaults to 500 and must be positive.
    pub fn insert_batch_size(&self) -> Result<usize> {
        match self.insert_batch_size {
            None => Ok(DEFAULT_INSERT_BATCH_SIZE),
            Some(0) => Err(TrackerError::InvalidConfiguration(
                "store.insert_batch_size must be positive".to_string(),
            )),
            Some(n) => Ok(n),
        }
    }
}

/// Optional narrowing of the pending read.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FetchFilterConfig {
    /// Only rows of this pipeline.
    pub pipeline_name: Option<String>,
    /// Only rows of this configuration.
    pub config_name: Option<String>,
}

/// One `[pipelines.<key>]` table as written.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Logical pipeline name.
    pub pipeline_name: Option<String>,
    /// Configuration variant.
    pub config_name: Option<String>,
    /// IANA zone used for window alignment.
    pub timezone: Option<String>,
    /// Window length in the duration grammar.
    pub query_interval_window: Option<String>,
    /// Hold-back for late data in the duration grammar.
    pub data_freshness_block_window: Option<String>,
    /// Page size of the pending read.
    pub max_pending_records: Option<usize>,
    /// Phases pre-marked as skipped on new records.
    pub skip_phases: Option<Vec<String>>,
    /// Optional narrowing of the pending read.
    pub fetch_filter: Option<FetchFilterConfig>,
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| TrackerError::MissingConfiguration(key.to_string()))
}

fn non_blank(value: &str, key: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::InvalidConfiguration(format!("{key} must not be blank")));
    }
    Ok(trimmed.to_string())
}

fn optional_name(value: &Option<String>, key: &str) -> Result<Option<String>> {
    value.as_deref().map(|v| non_blank(v, key)).transpose()
}

impl PipelineConfig {
    /// Validates this table into [`PipelineSettings`].
    pub fn resolve(&self) -> Result<PipelineSettings> {
        let pipeline_name =
            non_blank(required(&self.pipeline_name, "pipeline_name")?, "pipeline_name")?;
        let config_name = non_blank(required(&self.config_name, "config_name")?, "config_name")?;
        let timezone = parse_timezone(required(&self.timezone, "timezone")?)?;

        let query_interval_text = required(&self.query_interval_window, "query_interval_window")?
            .trim()
            .to_string();
        let query_interval_window =
            parse_duration(&query_interval_text)?.ensure_positive("query_interval_window")?;

        let freshness_text =
            required(&self.data_freshness_block_window, "data_freshness_block_window")?;
        let data_freshness_block_window = parse_duration(freshness_text)?;

        let max_pending_records = match self.max_pending_records {
            None => {
                return Err(TrackerError::MissingConfiguration(
                    "max_pending_records".to_string(),
                ));
            }
            Some(0) => {
                return Err(TrackerError::InvalidConfiguration(
                    "max_pending_records must be positive".to_string(),
                ));
            }
            Some(n) => n,
        };

        let skip_phases = match &self.skip_phases {
            None => PipelinePhase::DEFAULT_SKIPPED.to_vec(),
            Some(names) => names
                .iter()
                .map(|name| name.parse::<PipelinePhase>())
                .collect::<Result<Vec<_>>>()?,
        };

        let fetch_filter = match &self.fetch_filter {
            None => RecordFilter::pair(pipeline_name.clone(), config_name.clone()),
            Some(filter) => RecordFilter {
                pipeline_name: optional_name(&filter.pipeline_name, "fetch_filter.pipeline_name")?,
                config_name: optional_name(&filter.config_name, "fetch_filter.config_name")?,
            },
        };

        Ok(PipelineSettings {
            pipeline_name,
            config_name,
            timezone,
            query_interval_text,
            query_interval_window,
            data_freshness_block_window,
            max_pending_records,
            skip_phases,
            fetch_filter,
        })
    }
}

/// Validated settings of one pipeline, ready for the orchestrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Logical pipeline name.
    pub pipeline_name: String,
    /// Configuration variant.
    pub config_name: String,
    /// Zone used for window alignment and `query_window_day`.
    pub timezone: Tz,
    /// Window length as configured, stored on every record.
    pub query_interval_text: String,
    /// Window length.
    pub query_interval_window: Span,
    /// Hold-back for late data; may be zero.
    pub data_freshness_block_window: Span,
    /// Page size of the pending read.
    pub max_pending_records: usize,
    /// Phases pre-marked as skipped on new records.
    pub skip_phases: Vec<PipelinePhase>,
    /// Narrowing of the pending read.
    pub fetch_filter: RecordFilter,
}

impl PipelineSettings {
    /// Record builder for this pipeline's windows.
    pub fn record_builder(&self) -> Result<RecordBuilder> {
        Ok(RecordBuilder::new(
            self.pipeline_name.clone(),
            self.config_name.clone(),
            &self.query_interval_text,
        )?
        .with_skip_phases(&self.skip_phases))
    }
}

/// Parse a TOML string into a [`TrackerConfig`] and validate every pipeline.
pub fn load_config_str(s: &str) -> Result<TrackerConfig> {
    let cfg: TrackerConfig =
        toml::from_str(s).map_err(|e| TrackerError::InvalidConfiguration(e.to_string()))?;
    cfg.store.insert_batch_size()?;
    cfg.resolve_all()?;
    Ok(cfg)
}

/// Read a TOML file from disk and delegate to [`load_config_str`].
pub fn load_config_path(path: impl AsRef<Path>) -> Result<TrackerConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        TrackerError::MissingConfiguration(format!("cannot read {}: {e}", path.display()))
    })?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [store]
        database_url = "tracking.db"
        insert_batch_size = 50

        [pipelines.orders_hourly]
        pipeline_name = " orders "
        config_name = "orders_es_to_sf"
        timezone = "America/New_York"
        query_interval_window = "1h"
        data_freshness_block_window = "0h"
        max_pending_records = 10

        [pipelines.events_daily]
        pipeline_name = "events"
        config_name = "events_daily"
        timezone = "UTC"
        query_interval_window = "1d"
        data_freshness_block_window = "2h"
        max_pending_records = 3
        skip_phases = []
        [pipelines.events_daily.fetch_filter]
        pipeline_name = "events"
    "#;

    #[test]
    fn sample_resolves_in_declaration_order() {
        let cfg = load_config_str(SAMPLE).unwrap();
        let all = cfg.resolve_all().unwrap();
        assert_eq!(all[0].0, "orders_hourly");
        assert_eq!(all[1].0, "events_daily");

        let orders = &all[0].1;
        assert_eq!(orders.pipeline_name, "orders");
        assert_eq!(orders.timezone, chrono_tz::America::New_York);
        assert_eq!(orders.query_interval_window, parse_duration("1h").unwrap());
        assert_eq!(orders.skip_phases, PipelinePhase::DEFAULT_SKIPPED.to_vec());
        assert_eq!(orders.fetch_filter, RecordFilter::pair("orders", "orders_es_to_sf"));

        let events = cfg.pipeline("events_daily").unwrap();
        assert!(events.skip_phases.is_empty());
        assert_eq!(events.fetch_filter.pipeline_name.as_deref(), Some("events"));
        assert_eq!(events.fetch_filter.config_name, None);
        assert_eq!(cfg.store.insert_batch_size().unwrap(), 50);
        assert_eq!(cfg.store.database_url().unwrap(), "tracking.db");
    }

    #[test]
    fn missing_key_names_the_key() {
        let cfg = PipelineConfig {
            pipeline_name: Some("orders".into()),
            config_name: Some("c".into()),
            timezone: Some("UTC".into()),
            query_interval_window: Some("1h".into()),
            max_pending_records: Some(5),
            ..PipelineConfig::default()
        };
        let err = cfg.resolve().unwrap_err();
        assert_eq!(err.kind().as_str(), "MISSING_CONFIGURATION");
        assert!(err.to_string().contains("data_freshness_block_window"));

        let err = load_config_str(SAMPLE).unwrap().pipeline("nope").unwrap_err();
        assert_eq!(err.kind().as_str(), "MISSING_CONFIGURATION");
    }

    #[test]
    fn bad_values_map_to_their_kinds() {
        let base = load_config_str(SAMPLE).unwrap().pipelines["orders_hourly"].clone();

        let with = |edit: fn(&mut PipelineConfig)| {
            let mut cfg = base.clone();
            edit(&mut cfg);
            cfg
        };
        let cases: [(PipelineConfig, &str); 6] = [
            (
                with(|c| c.query_interval_window = Some("2m1h".into())),
                "INVALID_DURATION_FORMAT",
            ),
            (
                with(|c| c.query_interval_window = Some("0h".into())),
                "NON_POSITIVE_DURATION",
            ),
            (
                with(|c| c.timezone = Some("Nowhere/City".into())),
                "INVALID_CONFIGURATION",
            ),
            (
                with(|c| c.config_name = Some("   ".into())),
                "INVALID_CONFIGURATION",
            ),
            (
                with(|c| c.max_pending_records = Some(0)),
                "INVALID_CONFIGURATION",
            ),
            (
                with(|c| c.skip_phases = Some(vec!["NAP".into()])),
                "INVALID_CONFIGURATION",
            ),
        ];
        for (cfg, kind) in cases {
            assert_eq!(cfg.resolve().unwrap_err().kind().as_str(), kind);
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = load_config_str("[store]\ndatabase = \"x\"\n").unwrap_err();
        assert_eq!(err.kind().as_str(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let cfg = load_config_path(file.path()).unwrap();
        assert_eq!(cfg.pipelines.len(), 2);

        let err = load_config_path("/no/such/tracker.toml").unwrap_err();
        assert_eq!(err.kind().as_str(), "MISSING_CONFIGURATION");
    }
}
