// src/export.rs
//
// Tabular audit trail of one comparison: one row per compared field, one per
// remaining extracted field, then a verdict row.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::compare::MatchResult;
use crate::error::ExportError;
use crate::record::DocumentRecord;
use crate::rules::FieldName;

const VERDICT_ROW: &str = "verdict";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRow {
    pub field: String,
    pub proforma: String,
    pub agreement: String,
    pub matched: String,
}

/// Compared fields first, in comparison order. Every other extracted field
/// follows with an empty `matched` cell. Missing values show as empty cells.
pub fn to_rows(
    proforma: &DocumentRecord,
    agreement: &DocumentRecord,
    result: &MatchResult,
) -> Vec<AuditRow> {
    let cell = |record: &DocumentRecord, field: FieldName| {
        record.get(field).map(ToString::to_string).unwrap_or_default()
    };

    let mut rows: Vec<AuditRow> = result
        .iter()
        .map(|m| AuditRow {
            field: m.field.to_string(),
            proforma: cell(proforma, m.field),
            agreement: cell(agreement, m.field),
            matched: m.matched.to_string(),
        })
        .collect();

    let uncompared: BTreeSet<FieldName> = proforma
        .iter()
        .chain(agreement.iter())
        .map(|(field, _)| field)
        .filter(|field| result.get(*field).is_none())
        .collect();
    rows.extend(uncompared.into_iter().map(|field| AuditRow {
        field: field.to_string(),
        proforma: cell(proforma, field),
        agreement: cell(agreement, field),
        matched: String::new(),
    }));

    rows.push(AuditRow {
        field: VERDICT_ROW.to_string(),
        proforma: String::new(),
        agreement: String::new(),
        matched: result.verdict().to_string(),
    });
    rows
}

pub fn write_csv<W: Write>(
    writer: W,
    proforma: &DocumentRecord,
    agreement: &DocumentRecord,
    result: &MatchResult,
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in to_rows(proforma, agreement, result) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_file(
    path: &Path,
    proforma: &DocumentRecord,
    agreement: &DocumentRecord,
    result: &MatchResult,
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(file, proforma, agreement, result)?;
    info!(path = %path.display(), fields = result.len(), "Audit CSV written");
    Ok(())
}
