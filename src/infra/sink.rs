use crate::app::ports::RecordSink;
use crate::config::{SinkConfig, SinkDriver};
use crate::error::Result;
use crate::types::ReconciledRecord;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn build_sink(config: &SinkConfig) -> Box<dyn RecordSink> {
    match config.driver {
        SinkDriver::Sqlite => Box::new(SqliteSink::new(&config.database_name, &config.table_name)),
        SinkDriver::Json => Box::new(JsonFileSink::new(&config.output_dir, &config.table_name)),
    }
}

/// Writes each batch to a new timestamped JSON file.
pub struct JsonFileSink {
    output_dir: PathBuf,
    table_name: String,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, table_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            table_name: table_name.into(),
        }
    }

    fn persist(&self, records: &[ReconciledRecord]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S%3f");
        let filepath = self.output_dir.join(format!("{}_{}.json", self.table_name, timestamp));

        let json_content = serde_json::to_string_pretty(records)?;
        fs::write(&filepath, json_content)?;
        Ok(filepath)
    }
}

impl RecordSink for JsonFileSink {
    fn name(&self) -> &str {
        "json"
    }

    fn write(&self, records: &[ReconciledRecord]) -> Result<usize> {
        let filepath = self.persist(records)?;
        info!("💾 Saved {} records to {}", records.len(), filepath.display());
        Ok(records.len())
    }
}

/// Appends records to a table in a local SQLite database.
pub struct SqliteSink {
    path: PathBuf,
    table_name: String,
}

impl SqliteSink {
    /// `table_name` is interpolated into SQL; config validation restricts it to an identifier.
    pub fn new(path: impl AsRef<Path>, table_name: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table_name: table_name.into(),
        }
    }
}

impl RecordSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write(&self, records: &[ReconciledRecord]) -> Result<usize> {
        let mut conn = Connection::open(&self.path)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                name TEXT NOT NULL,
                wikilink TEXT NOT NULL,
                city TEXT NOT NULL,
                visitors INTEGER NOT NULL,
                characteristics TEXT,
                city_population INTEGER
            )",
            self.table_name
        ))?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (name, wikilink, city, visitors, characteristics, city_population)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                self.table_name
            ))?;
            for r in records {
                stmt.execute(params![
                    r.name,
                    r.wikilink,
                    r.city,
                    r.visitors,
                    r.characteristics,
                    r.city_population
                ])?;
            }
        }
        tx.commit()?;

        info!("💾 Appended {} records to {}:{}", records.len(), self.path.display(), self.table_name);
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str, visitors: i64) -> ReconciledRecord {
        ReconciledRecord {
            name: name.to_string(),
            wikilink: format!("https://en.wikipedia.org/wiki/{name}"),
            city: "Paris".to_string(),
            visitors,
            characteristics: Some(r#"[["Type","Art museum"]]"#.to_string()),
            city_population: None,
        }
    }

    #[test]
    fn test_sqlite_sink_appends() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("museums.db");
        let sink = SqliteSink::new(&db, "museums");

        assert_eq!(sink.write(&[record("Louvre", 8_900_000)]).unwrap(), 1);
        assert_eq!(sink.write(&[record("Orsay", 3_600_000), record("Pompidou", 3_500_000)]).unwrap(), 2);

        let conn = Connection::open(&db).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM museums", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);

        let population: Option<i64> = conn
            .query_row("SELECT city_population FROM museums WHERE name = 'Louvre'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(population, None);
    }

    #[test]
    fn test_json_sink_writes_file() {
        let dir = tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path(), "museums");
        let records = vec![record("Louvre", 8_900_000)];

        let path = sink.persist(&records).unwrap();
        let written: Vec<ReconciledRecord> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, records);
    }
}
