// CSV report files for bias records and the topic evolution table.
//
// Files start with a UTF-8 byte order mark so that spreadsheet tools open
// the Chinese text correctly. Fields are quoted only when they contain a
// comma, quote or line break.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::narrative::bias::BiasRecord;
use crate::topics::alignment::EvolutionRow;

const BOM: &str = "\u{feff}";

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(fields: &[String]) -> String {
    let mut line = fields
        .iter()
        .map(|f| field(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render narrative bias records as CSV.
pub fn bias_csv(records: &[BiasRecord]) -> String {
    let mut out = String::from(BOM);
    out.push_str(&row(&[
        "target_word".into(),
        "document_id".into(),
        "year".into(),
        "period".into(),
        "similarity_personal".into(),
        "similarity_structural".into(),
        "bias_score".into(),
        "occurrences".into(),
    ]));

    for r in records {
        out.push_str(&row(&[
            r.target_word.clone(),
            r.document_id.clone(),
            opt(r.year),
            opt(r.period.as_deref()),
            r.similarity_personal.to_string(),
            r.similarity_structural.to_string(),
            r.bias_score.to_string(),
            r.occurrences.to_string(),
        ]));
    }
    out
}

/// Render the topic evolution table as CSV.
pub fn evolution_csv(rows: &[EvolutionRow]) -> String {
    let mut out = String::from(BOM);
    out.push_str(&row(&[
        "change_type".into(),
        "topic_label_p1".into(),
        "keywords_p1".into(),
        "topic_label_p2".into(),
        "keywords_p2".into(),
        "similarity".into(),
    ]));

    for r in rows {
        out.push_str(&row(&[
            r.change_type.to_string(),
            r.topic_label_p1.clone(),
            r.keywords_p1.clone(),
            r.topic_label_p2.clone(),
            r.keywords_p2.clone(),
            opt(r.similarity),
        ]));
    }
    out
}

/// Write a rendered report, creating parent directories as needed.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!(path = %path.display(), bytes = content.len(), "Wrote report");
    Ok(())
}
