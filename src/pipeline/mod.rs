pub mod enrich;
pub mod reconcile;

use crate::app::ports::Fetcher;
use crate::config::SourcesConfig;
use crate::error::{EtlError, Result};
use crate::loader::{self, Loaded};
use crate::mappers::{CityColumns, MuseumColumns};
use crate::types::{CharacteristicsRecord, CityRecord, Facts, MuseumRecord, ReconciledRecord};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use self::enrich::KeyedOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    MuseumList,
    CityList,
    Characteristics,
    Backfill,
}

/// A key that could not be extracted during a run
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub stage: Stage,
    pub key: String,
    pub error: String,
}

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub museums: usize,
    pub cities: usize,
    pub characteristics_fetched: usize,
    pub backfilled_cities: usize,
    pub records: Vec<ReconciledRecord>,
    pub failures: Vec<Failure>,
}

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    sources: SourcesConfig,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, sources: SourcesConfig, concurrency: usize) -> Self {
        Self {
            fetcher,
            sources,
            concurrency: concurrency.max(1),
        }
    }

    /// Run every stage and reconcile the three datasets.
    ///
    /// Only a failure to load one of the two list tables aborts the run;
    /// per-museum and per-city failures end up in the report.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();
        let t_run = Instant::now();
        let mut failures = Vec::new();
        info!("🚀 Starting museum reconciliation run");

        // Stage 1
        let museums = self.load_museums(&mut failures).await?;

        // Stages 2 and 3 do not depend on each other
        let (characteristics, cities) =
            tokio::join!(self.load_characteristics(&museums), self.load_cities());
        let cities = cities?;
        record_row_failures(Stage::CityList, &cities, &mut failures);
        let cities = cities.rows;

        let mut characteristics_by_name = HashMap::new();
        for (name, outcome) in characteristics {
            match outcome.and_then(|facts| {
                CharacteristicsRecord { museum_name: name.clone(), facts }.serialize_facts()
            }) {
                Ok(serialized) => {
                    characteristics_by_name.insert(name, serialized);
                }
                Err(e) => push_failure(&mut failures, Stage::Characteristics, name, &e),
            }
        }

        // Stages 4 and 5
        let joined = reconcile::join_cities(&museums, &cities);
        let missing = reconcile::missing_cities(&joined);
        info!("🔎 {} cities need a population backfill", missing.len());

        // Stage 6
        let backfill = self.backfill(missing, &mut failures).await;

        // Stages 7 to 9
        let merged = reconcile::merge_backfill(joined, &backfill);
        let records = reconcile::project_and_filter(merged, &characteristics_by_name);

        counter!("museum_etl_records_total").increment(records.len() as u64);
        counter!("museum_etl_failures_total").increment(failures.len() as u64);
        histogram!("museum_etl_run_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(
            "✅ Reconciled {} records ({} museums, {} cities, {} failures)",
            records.len(),
            museums.len(),
            cities.len(),
            failures.len()
        );

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            museums: museums.len(),
            cities: cities.len(),
            characteristics_fetched: characteristics_by_name.len(),
            backfilled_cities: backfill.len(),
            records,
            failures,
        })
    }

    async fn load_museums(&self, failures: &mut Vec<Failure>) -> Result<Vec<MuseumRecord>> {
        info!("📡 Loading museums from {}", self.sources.museums_url);
        let mapper = MuseumColumns::new(self.sources.site_origin.as_str());
        let loaded = loader::load(
            self.fetcher.as_ref(),
            &self.sources.museums_url,
            &self.sources.museums_table_class,
            &mapper,
        )
        .await
        .map_err(|e| {
            error!("Museum list could not be loaded: {}", e);
            e
        })?;
        record_row_failures(Stage::MuseumList, &loaded, failures);
        Ok(loaded.rows)
    }

    async fn load_cities(&self) -> Result<Loaded<CityRecord>> {
        info!("📡 Loading cities from {}", self.sources.cities_url);
        loader::load(
            self.fetcher.as_ref(),
            &self.sources.cities_url,
            &self.sources.cities_table_class,
            &CityColumns,
        )
        .await
    }

    async fn load_characteristics(&self, museums: &[MuseumRecord]) -> Vec<KeyedOutcome<Facts>> {
        let mut seen = HashSet::new();
        let targets: Vec<(String, String)> = museums
            .iter()
            .filter(|m| seen.insert(m.name.clone()))
            .map(|m| (m.name.clone(), m.wiki_link.clone()))
            .collect();

        info!("🔧 Fetching characteristics for {} museums", targets.len());
        let t_stage = Instant::now();
        let outcomes = enrich::fetch_characteristics(self.fetcher.as_ref(), targets, self.concurrency).await;
        histogram!("museum_etl_stage_duration_seconds", "stage" => "characteristics")
            .record(t_stage.elapsed().as_secs_f64());
        outcomes
    }

    async fn backfill(&self, missing: Vec<(String, String)>, failures: &mut Vec<Failure>) -> HashMap<String, i64> {
        let t_stage = Instant::now();
        let outcomes = enrich::fetch_populations(self.fetcher.as_ref(), missing, self.concurrency).await;
        histogram!("museum_etl_stage_duration_seconds", "stage" => "backfill")
            .record(t_stage.elapsed().as_secs_f64());

        let mut backfill = HashMap::new();
        for (city, outcome) in outcomes {
            match outcome {
                Ok(population) => {
                    // A city listed under two links keeps its first-seen answer
                    backfill.entry(city).or_insert(population);
                }
                Err(e) => push_failure(failures, Stage::Backfill, city, &e),
            }
        }
        backfill
    }
}

fn record_row_failures<T>(stage: Stage, loaded: &Loaded<T>, failures: &mut Vec<Failure>) {
    for f in &loaded.failures {
        push_failure(failures, stage, format!("row {}", f.row_index), &f.error);
    }
}

fn push_failure(failures: &mut Vec<Failure>, stage: Stage, key: String, error: &EtlError) {
    warn!(?stage, key = %key, %error, "Extraction failed");
    failures.push(Failure {
        stage,
        key,
        error: error.to_string(),
    });
}
