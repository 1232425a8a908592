use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{IndicatorRecord, MedicalReport};

use super::parse_timestamp;

pub fn insert_report(conn: &Connection, report: &MedicalReport) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO reports (report_id, patient_id, report_date, indicators_json,
         abnormal_conditions_json, overall_assessment, recommendations_json, confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            report.report_id.to_string(),
            report.patient_id,
            report.report_date.to_string(),
            serde_json::to_string(&report.indicators)?,
            serde_json::to_string(&report.abnormal_conditions)?,
            report.overall_assessment,
            serde_json::to_string(&report.recommendations)?,
            report.confidence,
            report.created_at.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_report(conn: &Connection, report_id: &Uuid) -> Result<Option<MedicalReport>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT report_id, patient_id, report_date, indicators_json, abnormal_conditions_json,
             overall_assessment, recommendations_json, confidence, created_at
             FROM reports WHERE report_id = ?1",
            params![report_id.to_string()],
            report_row_from_rusqlite,
        )
        .optional()?;

    row.map(report_from_row).transpose()
}

/// A patient's reports, newest first. `limit = None` returns all of them.
pub fn list_reports_for_patient(
    conn: &Connection,
    patient_id: &str,
    limit: Option<u32>,
) -> Result<Vec<MedicalReport>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT report_id, patient_id, report_date, indicators_json, abnormal_conditions_json,
         overall_assessment, recommendations_json, confidence, created_at
         FROM reports WHERE patient_id = ?1
         ORDER BY report_date DESC, created_at DESC
         LIMIT ?2",
    )?;

    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map_or(-1, i64::from);
    let rows = stmt.query_map(params![patient_id, limit], report_row_from_rusqlite)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(report_from_row(row?)?);
    }
    Ok(reports)
}

/// Up to `limit` reports dated on or before `on_or_before`, newest first.
/// This is the history a new report for that date is compared against.
pub fn list_reports_before(
    conn: &Connection,
    patient_id: &str,
    on_or_before: NaiveDate,
    limit: u32,
) -> Result<Vec<MedicalReport>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT report_id, patient_id, report_date, indicators_json, abnormal_conditions_json,
         overall_assessment, recommendations_json, confidence, created_at
         FROM reports WHERE patient_id = ?1 AND report_date <= ?2
         ORDER BY report_date DESC, created_at DESC
         LIMIT ?3",
    )?;

    let rows = stmt.query_map(
        params![patient_id, on_or_before.to_string(), i64::from(limit)],
        report_row_from_rusqlite,
    )?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(report_from_row(row?)?);
    }
    Ok(reports)
}

pub fn count_reports_for_patient(conn: &Connection, patient_id: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM reports WHERE patient_id = ?1",
        params![patient_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// Internal row type for MedicalReport mapping
struct ReportRow {
    report_id: String,
    patient_id: String,
    report_date: String,
    indicators_json: String,
    abnormal_conditions_json: String,
    overall_assessment: String,
    recommendations_json: String,
    confidence: f64,
    created_at: String,
}

fn report_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ReportRow, rusqlite::Error> {
    Ok(ReportRow {
        report_id: row.get(0)?,
        patient_id: row.get(1)?,
        report_date: row.get(2)?,
        indicators_json: row.get(3)?,
        abnormal_conditions_json: row.get(4)?,
        overall_assessment: row.get(5)?,
        recommendations_json: row.get(6)?,
        confidence: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn report_from_row(row: ReportRow) -> Result<MedicalReport, DatabaseError> {
    let indicators: BTreeMap<String, IndicatorRecord> = serde_json::from_str(&row.indicators_json)?;
    Ok(MedicalReport {
        report_id: Uuid::parse_str(&row.report_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: row.patient_id,
        report_date: NaiveDate::parse_from_str(&row.report_date, "%Y-%m-%d")
            .map_err(|e| DatabaseError::ConstraintViolation(format!("report_date: {e}")))?,
        indicators,
        abnormal_conditions: serde_json::from_str(&row.abnormal_conditions_json)?,
        overall_assessment: row.overall_assessment,
        recommendations: serde_json::from_str(&row.recommendations_json)?,
        confidence: row.confidence,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
