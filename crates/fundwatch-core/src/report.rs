//! Daily dividend report.
//!
//! For every configured fund the latest net worth is scraped and the
//! dividend is sized against the user's holdings:
//!
//! `dividend = (num * net_worth) / fund_net_worth * dividend_percentage`
//!
//! Records are written to a JSON object keyed by fund code, highest
//! dividend first.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{info, warn};

use crate::models::{FundRecord, FundSource, UserData};
use crate::scraper::NetWorthSource;
use crate::utils::parse_amount;

/// Default location of the fund sources file
pub const SOURCES_FILE: &str = "crawlers/config.json";

/// Default location of the user holdings file
pub const USER_DATA_FILE: &str = "user_data.json";

/// Default location of the written report
pub const RECORDS_FILE: &str = "records.json";

/// Fund sources keyed by fund code, in file order
pub type FundSources = IndexMap<String, FundSource>;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn read_sources(path: &Path) -> Result<FundSources> {
    read_json(path)
}

pub fn read_user_data(path: &Path) -> Result<UserData> {
    read_json(path)
}

/// Records serialised as a map from code to record, in slice order.
struct RecordMap<'a>(&'a [FundRecord]);

impl Serialize for RecordMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            map.serialize_entry(&record.code, record)?;
        }
        map.end()
    }
}

/// Write records keyed by code, ordered by dividend descending. Equal
/// dividends keep their input order.
pub fn write_records(path: &Path, records: &[FundRecord]) -> Result<()> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.dividend.total_cmp(&a.dividend));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string(&RecordMap(&sorted))?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Build one record per source whose net worth could be read.
/// Sources with an unusable net worth are skipped with a warning.
pub async fn build_day_records<S: NetWorthSource>(
    scraper: &S,
    sources: &FundSources,
    fund_total: f64,
) -> Vec<FundRecord> {
    let date = Local::now().format("%Y-%m-%d").to_string();
    let mut records = Vec::with_capacity(sources.len());

    for (code, source) in sources {
        let raw = scraper.fetch_net_worth(&source.url).await;
        let net_worth = match parse_amount(&raw).filter(|v| *v > 0.0) {
            Some(v) => v,
            None => {
                warn!(code = %code, net_worth = %raw, "Skipping fund without a usable net worth");
                continue;
            }
        };

        let record = FundRecord {
            code: code.clone(),
            name: source.name.clone(),
            dividend: fund_total / net_worth * source.dividend_percentage,
            date: date.clone(),
        };
        info!(code = %record.code, name = %record.name, dividend = record.dividend, date = %record.date, "Created record");
        records.push(record);
    }
    records
}

/// Read the inputs, build the day's records and write them to `output`.
pub async fn generate_report<S: NetWorthSource>(
    scraper: &S,
    sources_path: &Path,
    user_data_path: &Path,
    output: &Path,
) -> Result<Vec<FundRecord>> {
    let sources = read_sources(sources_path)?;
    let user = read_user_data(user_data_path)?;

    let records = build_day_records(scraper, &sources, user.fund_total()).await;
    write_records(output, &records)?;
    info!(count = records.len(), path = %output.display(), "Report written");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::NOT_FOUND;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct FixedNetWorth(HashMap<String, String>);

    impl NetWorthSource for FixedNetWorth {
        async fn fetch_net_worth(&self, url: &str) -> String {
            self.0.get(url).cloned().unwrap_or_else(|| NOT_FOUND.to_string())
        }
    }

    fn source(name: &str, url: &str, pct: f64) -> FundSource {
        FundSource {
            name: name.to_string(),
            url: url.to_string(),
            dividend_percentage: pct,
        }
    }

    fn scraper() -> FixedNetWorth {
        FixedNetWorth(HashMap::from([
            ("u/a".to_string(), "10".to_string()),
            ("u/b".to_string(), "4".to_string()),
        ]))
    }

    #[tokio::test]
    async fn test_build_day_records() {
        let sources = FundSources::from([
            ("A".to_string(), source("Alpha", "u/a", 0.05)),
            ("B".to_string(), source("Beta", "u/b", 0.02)),
            ("C".to_string(), source("Gamma", "u/missing", 0.1)),
        ]);

        let records = build_day_records(&scraper(), &sources, 1000.0).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, "A");
        assert!((records[0].dividend - 5.0).abs() < 1e-9);
        assert_eq!(records[1].code, "B");
        assert!((records[1].dividend - 5.0).abs() < 1e-9);
        assert_eq!(records[0].date.len(), 10);
    }

    #[test]
    fn test_write_records_sorted_by_dividend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join(RECORDS_FILE);
        let record = |code: &str, dividend: f64| FundRecord {
            code: code.to_string(),
            name: code.to_lowercase(),
            dividend,
            date: "2024-01-02".to_string(),
        };

        write_records(&path, &[record("A", 1.0), record("B", 3.0), record("C", 2.0)]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let b = contents.find("\"B\"").unwrap();
        let c = contents.find("\"C\"").unwrap();
        let a = contents.find("\"A\"").unwrap();
        assert!(b < c && c < a);

        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["B"]["dividen"], 3.0);
        assert_eq!(parsed["A"]["name"], "a");
    }

    #[tokio::test]
    async fn test_generate_report() {
        let dir = tempdir().unwrap();
        let sources_path = dir.path().join("sources.json");
        let user_path = dir.path().join(USER_DATA_FILE);
        let output = dir.path().join(RECORDS_FILE);
        std::fs::write(
            &sources_path,
            r#"{"A": {"name": "Alpha", "url": "u/a", "dividenPercentage": 0.1}}"#,
        )
        .unwrap();
        std::fs::write(&user_path, r#"{"num": 100, "net_worth": 20}"#).unwrap();

        let records = generate_report(&scraper(), &sources_path, &user_path, &output)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        // 100 * 20 / 10 * 0.1
        assert!((records[0].dividend - 20.0).abs() < 1e-9);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_generate_report_missing_inputs() {
        let dir = tempdir().unwrap();
        let err = generate_report(
            &scraper(),
            &dir.path().join("nope.json"),
            &dir.path().join(USER_DATA_FILE),
            &dir.path().join(RECORDS_FILE),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[tokio::test]
    async fn test_sources_keep_file_order() {
        let dir = tempdir().unwrap();
        let sources_path = dir.path().join("sources.json");
        let user_path = dir.path().join(USER_DATA_FILE);
        let output = dir.path().join(RECORDS_FILE);
        std::fs::write(
            &sources_path,
            r#"{
                "Z": {"name": "Zeta", "url": "u/a", "dividenPercentage": 0.1},
                "A": {"name": "Alpha", "url": "u/a", "dividenPercentage": 0.1}
            }"#,
        )
        .unwrap();
        std::fs::write(&user_path, r#"{"num": 100, "net_worth": 20}"#).unwrap();

        let records = generate_report(&scraper(), &sources_path, &user_path, &output)
            .await
            .unwrap();

        let codes: Vec<_> = records.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["Z", "A"]);
        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(contents.find("\"Z\"").unwrap() < contents.find("\"A\"").unwrap());
    }
}
