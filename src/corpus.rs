// Corpus records and the JSON Lines loader.
//
// A document is an id, its raw text, and the metadata the bias results are
// grouped by (year and period). The loader accepts the column names of the
// cleaned news exports (`content`, `publish_time`) as well as the plain
// `text`/`year` form, and derives missing metadata:
//
//   year   <- year of publish_time
//   period <- PeriodScheme bucket of year

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One document of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique, stable within a run.
    pub id: String,
    pub text: String,
    pub year: Option<i32>,
    pub period: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            year: None,
            period: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }
}

/// Year cut-offs for bucketing documents into named periods.
///
/// A year belongs to the first bucket whose upper bound it does not exceed;
/// years above every bound fall into `latest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodScheme {
    /// (inclusive upper year, label), ascending by year
    pub buckets: Vec<(i32, String)>,
    pub latest: String,
}

impl Default for PeriodScheme {
    fn default() -> Self {
        Self {
            buckets: vec![(2016, "early".to_string()), (2020, "mid".to_string())],
            latest: "late".to_string(),
        }
    }
}

impl PeriodScheme {
    pub fn period_for_year(&self, year: i32) -> &str {
        self.buckets
            .iter()
            .find(|(upper, _)| year <= *upper)
            .map(|(_, label)| label.as_str())
            .unwrap_or(&self.latest)
    }
}

/// Ids may be numeric or textual in the source exports.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Int(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
struct RawRecord {
    id: Option<RawId>,
    #[serde(alias = "content")]
    text: Option<String>,
    year: Option<i32>,
    #[serde(alias = "time_period")]
    period: Option<String>,
    publish_time: Option<String>,
}

/// Counts reported by the loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub skipped_no_text: usize,
    pub unparsed_dates: usize,
}

/// Parse a publish timestamp in one of the formats the exports use.
pub fn parse_publish_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.year());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.year());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.year());
        }
    }
    None
}

/// Parse JSON Lines corpus content.
///
/// Lines without an id get their 0-based line index as id. Blank lines are
/// ignored. Records with no text are skipped and counted. A duplicate id is
/// an error, since results are keyed by document id.
pub fn parse_jsonl(content: &str, scheme: &PeriodScheme) -> Result<(Vec<Document>, LoadStats)> {
    let mut documents = Vec::new();
    let mut stats = LoadStats::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record: RawRecord = serde_json::from_str(line)
            .with_context(|| format!("Invalid corpus record on line {}", line_no + 1))?;

        let Some(text) = record.text else {
            stats.skipped_no_text += 1;
            continue;
        };

        let id = record
            .id
            .map(RawId::into_string)
            .unwrap_or_else(|| line_no.to_string());

        if !seen.insert(id.clone()) {
            anyhow::bail!(
                "Duplicate document id {:?} on line {}. Document ids must be unique.",
                id,
                line_no + 1
            );
        }

        let year = match (record.year, record.publish_time.as_deref()) {
            (Some(y), _) => Some(y),
            (None, Some(ts)) => {
                let parsed = parse_publish_year(ts);
                if parsed.is_none() {
                    stats.unparsed_dates += 1;
                }
                parsed
            }
            (None, None) => None,
        };

        let period = record
            .period
            .or_else(|| year.map(|y| scheme.period_for_year(y).to_string()));

        documents.push(Document {
            id,
            text,
            year,
            period,
        });
    }

    stats.loaded = documents.len();
    Ok((documents, stats))
}

/// Load a JSON Lines corpus file.
pub fn load_jsonl(path: &Path, scheme: &PeriodScheme) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file {}", path.display()))?;

    let (documents, stats) = parse_jsonl(&content, scheme)?;

    info!(
        path = %path.display(),
        loaded = stats.loaded,
        skipped = stats.skipped_no_text,
        "Loaded corpus"
    );
    if stats.unparsed_dates > 0 {
        warn!(
            count = stats.unparsed_dates,
            "Some publish_time values could not be parsed; year left empty"
        );
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_scheme_default_buckets() {
        let scheme = PeriodScheme::default();
        assert_eq!(scheme.period_for_year(2010), "early");
        assert_eq!(scheme.period_for_year(2016), "early");
        assert_eq!(scheme.period_for_year(2017), "mid");
        assert_eq!(scheme.period_for_year(2020), "mid");
        assert_eq!(scheme.period_for_year(2021), "late");
    }

    #[test]
    fn test_parse_publish_year_formats() {
        assert_eq!(parse_publish_year("2018-03-04 10:11:12"), Some(2018));
        assert_eq!(parse_publish_year("2019-01-01"), Some(2019));
        assert_eq!(parse_publish_year("2021-06-01T08:00:00+08:00"), Some(2021));
        assert_eq!(parse_publish_year("2015/07/09"), Some(2015));
        assert_eq!(parse_publish_year("yesterday"), None);
    }

    #[test]
    fn test_parse_jsonl_derives_metadata() {
        let content = r#"{"id": 1, "content": "真相很复杂", "publish_time": "2015-05-01 00:00:00"}
{"id": "b", "text": "理解", "year": 2019}

{"id": 3, "text": "公正", "year": 2022, "period": "custom"}"#;
        let (docs, stats) = parse_jsonl(content, &PeriodScheme::default()).unwrap();

        assert_eq!(stats.loaded, 3);
        assert_eq!(docs[0].id, "1");
        assert_eq!(docs[0].year, Some(2015));
        assert_eq!(docs[0].period.as_deref(), Some("early"));
        assert_eq!(docs[1].id, "b");
        assert_eq!(docs[1].period.as_deref(), Some("mid"));
        assert_eq!(docs[2].period.as_deref(), Some("custom"));
    }

    #[test]
    fn test_parse_jsonl_skips_missing_text() {
        let content = "{\"id\": 1}\n{\"id\": 2, \"text\": \"x\"}\n";
        let (docs, stats) = parse_jsonl(content, &PeriodScheme::default()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(stats.skipped_no_text, 1);
    }

    #[test]
    fn test_parse_jsonl_rejects_duplicate_ids() {
        let content = "{\"id\": 1, \"text\": \"a\"}\n{\"id\": \"1\", \"text\": \"b\"}\n";
        let err = parse_jsonl(content, &PeriodScheme::default()).unwrap_err();
        assert!(err.to_string().contains("Duplicate document id"));
    }

    #[test]
    fn test_parse_jsonl_counts_bad_dates() {
        let content = "{\"id\": 1, \"text\": \"a\", \"publish_time\": \"n/a\"}\n";
        let (docs, stats) = parse_jsonl(content, &PeriodScheme::default()).unwrap();
        assert_eq!(docs[0].year, None);
        assert_eq!(docs[0].period, None);
        assert_eq!(stats.unparsed_dates, 1);
    }
}
