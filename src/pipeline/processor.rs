//! Report processing orchestrator.
//!
//! Single entry point that drives the full pipeline:
//! intake → extract → parse → trend/alerts → assemble → persist.
//!
//! The vision client is injected as a trait object so the orchestrator is
//! testable with `MockVisionClient`. Storage is borrowed per step through
//! `Store::with_conn`; the connection is never held across the extraction
//! call.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::repository;
use crate::db::{DatabaseError, Store};
use crate::identity::{self, IdentityError};
use crate::intelligence::{annotate_indicators, IndicatorHistory};
use crate::models::{MedicalReport, PatientInfo};
use crate::pipeline::extraction::{ExtractionError, ImageIntake, ImageSource, IntakeError, VisionClient};
use crate::pipeline::parsing::{parse_indicators, ParseError, ParseFault, ParseOutcome};
use crate::report::{assemble_report, ReportDraft};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Who is at fault for a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request itself is unusable; resubmitting it unchanged fails again.
    Input,
    /// A remote collaborator (image host, extraction service) failed.
    Upstream,
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Image intake failed: {0}")]
    Intake(#[from] IntakeError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Processing deadline exceeded before extraction")]
    DeadlineExceeded,

    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Patient identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ProcessingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_) | Self::Parse(_) => ErrorCategory::Input,
            Self::Intake(e) if e.is_upstream() => ErrorCategory::Upstream,
            Self::Intake(_) => ErrorCategory::Input,
            Self::Extraction(_) | Self::DeadlineExceeded => ErrorCategory::Upstream,
            Self::Identity(IdentityError::Database(_)) | Self::Database(_) => {
                ErrorCategory::Storage
            }
            Self::Identity(_) => ErrorCategory::Input,
        }
    }

    /// Rate limits and timeouts may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Extraction(e) => e.is_retryable(),
            Self::DeadlineExceeded => true,
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for ProcessingError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub patient: PatientInfo,
    pub image: ImageSource,
    /// Defaults to today.
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub report: MedicalReport,
    pub skipped_groups: Vec<ParseFault>,
    pub discarded_lines: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub identity_salt: String,
    /// Prior reports consulted for change and trend.
    pub history_window: u32,
    /// Upper bound for one extraction call; the request deadline may cut it
    /// shorter.
    pub extraction_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct ReportProcessor {
    vision: Box<dyn VisionClient>,
    intake: ImageIntake,
    config: ProcessorConfig,
}

impl ReportProcessor {
    pub fn new(
        vision: Box<dyn VisionClient>,
        config: ProcessorConfig,
    ) -> Result<Self, ProcessingError> {
        let intake = ImageIntake::new(config.extraction_timeout)?;
        Ok(Self {
            vision,
            intake,
            config,
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Run the pipeline for one report image.
    ///
    /// 1. Validate the patient fields
    /// 2. Resolve the image to a base64 payload
    /// 3. Extract text (bounded by `deadline`)
    /// 4. Parse indicator groups; zero indicators is an input fault
    /// 5. Compute change, trend and alerts against stored history
    /// 6. Assemble the report
    /// 7. Upsert the patient and insert the report in one transaction
    pub fn process(
        &self,
        store: &Store,
        request: &ProcessRequest,
        deadline: Instant,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let start = Instant::now();
        let patient_id = request.patient.patient_id.trim();
        if patient_id.is_empty() {
            return Err(ProcessingError::InvalidRequest("patient_id is required".into()));
        }
        if request.patient.name.trim().is_empty() {
            return Err(ProcessingError::InvalidRequest("patient name is required".into()));
        }

        let image = self.intake.resolve(&request.image)?;

        let timeout = deadline
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
            .ok_or(ProcessingError::DeadlineExceeded)?
            .min(self.config.extraction_timeout);
        let text = self.vision.extract_text(&image, timeout)?;

        let parsed = parse_indicators(&text).into_result()?;
        let confidence = parse_confidence(&parsed);
        let ParseOutcome {
            mut indicators,
            faults,
            discarded_lines,
        } = parsed;

        let report_date = request
            .report_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let history = store.with_conn(|conn| {
            repository::list_reports_before(
                conn,
                patient_id,
                report_date,
                self.config.history_window,
            )
        })?;
        annotate_indicators(&mut indicators, &IndicatorHistory::from_reports(&history));

        let report = assemble_report(ReportDraft {
            patient_id: patient_id.to_string(),
            report_date,
            indicators,
            confidence,
        });

        store.with_conn(|conn| -> Result<(), ProcessingError> {
            let tx = conn.unchecked_transaction()?;
            identity::upsert_patient(&tx, &self.config.identity_salt, &request.patient)?;
            repository::insert_report(&tx, &report)?;
            tx.commit()?;
            Ok(())
        })?;

        tracing::info!(
            report_id = %report.report_id,
            indicator_count = report.indicators.len(),
            abnormal = report.abnormal_count(),
            skipped = faults.len(),
            history_reports = history.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Report processed"
        );

        Ok(ProcessingOutcome {
            report,
            skipped_groups: faults,
            discarded_lines,
        })
    }
}

/// Share of complete groups that parsed.
fn parse_confidence(outcome: &ParseOutcome) -> f64 {
    let attempted = outcome.attempted_groups();
    if attempted == 0 {
        return 0.0;
    }
    outcome.indicators.len() as f64 / attempted as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use base64::Engine as _;

    use crate::models::enums::{AlertKind, AlertSeverity, IndicatorStatus, TrendDirection};
    use crate::pipeline::extraction::MockVisionClient;

    const SALT: &str = "test-salt";

    /// Lets a test keep a handle on the mock after handing it to the processor.
    struct SharedMock(Arc<MockVisionClient>);

    impl VisionClient for SharedMock {
        fn extract_text(
            &self,
            image: &crate::pipeline::extraction::ImagePayload,
            timeout: Duration,
        ) -> Result<String, ExtractionError> {
            self.0.extract_text(image, timeout)
        }
    }

    fn config() -> ProcessorConfig {
        ProcessorConfig {
            identity_salt: SALT.into(),
            history_window: 10,
            extraction_timeout: Duration::from_secs(30),
        }
    }

    fn processor(text: &str) -> (ReportProcessor, Arc<MockVisionClient>) {
        let mock = Arc::new(MockVisionClient::new(text));
        let processor =
            ReportProcessor::new(Box::new(SharedMock(mock.clone())), config()).unwrap();
        (processor, mock)
    }

    fn image() -> ImageSource {
        ImageSource::Base64(
            base64::engine::general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 1, 2]),
        )
    }

    fn request(day: u32) -> ProcessRequest {
        ProcessRequest {
            patient: PatientInfo {
                patient_id: "P001".into(),
                name: "Zhang San".into(),
                phone: "13800138000".into(),
            },
            image: image(),
            report_date: NaiveDate::from_ymd_opt(2024, 1, day),
        }
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn glucose(value: f64) -> String {
        format!("Glucose\n{value} mmol/L\n3.9-6.1\n")
    }

    #[test]
    fn processes_and_persists_report() {
        let store = Store::open_in_memory().unwrap();
        let text = "WBC\n5.5 10^9/L\n4.0-10.0\nALT\n80 U/L\n0-40\nPLT";
        let (processor, mock) = processor(text);

        let outcome = processor.process(&store, &request(1), deadline()).unwrap();
        assert_eq!(mock.call_count(), 1);
        assert_eq!(outcome.report.indicators.len(), 2);
        assert_eq!(outcome.discarded_lines, 1);
        assert!(outcome.skipped_groups.is_empty());
        assert_eq!(outcome.report.confidence, 1.0);
        assert_eq!(outcome.report.abnormal_conditions.len(), 1);
        assert_eq!(
            outcome.report.indicators["ALT"].alerts[0].kind,
            AlertKind::Threshold
        );

        let stored = store
            .with_conn(|conn| repository::get_report(conn, &outcome.report.report_id))
            .unwrap()
            .unwrap();
        assert_eq!(stored, outcome.report);
        let patient = store
            .with_conn(|conn| repository::get_patient(conn, "P001"))
            .unwrap()
            .unwrap();
        assert_eq!(patient.phone, "13800138000");
    }

    #[test]
    fn rejected_groups_lower_confidence() {
        let store = Store::open_in_memory().unwrap();
        let (processor, _) = processor("WBC\n5.5 10^9/L\n4-10\nALT\nabc\n0-40");
        let outcome = processor.process(&store, &request(1), deadline()).unwrap();
        assert_eq!(outcome.skipped_groups.len(), 1);
        assert_eq!(outcome.report.confidence, 0.5);
    }

    #[test]
    fn history_drives_trend_and_sudden_change() {
        let store = Store::open_in_memory().unwrap();
        let (processor, mock) = processor("");
        for (day, value) in [(1, 10.0), (2, 12.0), (3, 14.0), (4, 16.0)] {
            mock.set_response(&glucose(value));
            processor.process(&store, &request(day), deadline()).unwrap();
        }

        mock.set_response(&glucose(18.0));
        let outcome = processor.process(&store, &request(5), deadline()).unwrap();
        let record = &outcome.report.indicators["Glucose"];
        let trend = record.trend.as_ref().unwrap();
        assert_eq!(trend.trend, TrendDirection::Increasing);
        assert!((trend.slope - 2.0).abs() < 1e-9);
        let kinds: Vec<AlertKind> = record.alerts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Threshold, AlertKind::Trend]);

        // one patient row despite five upserts
        let count = store.with_conn(repository::count_patients).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn jump_from_previous_report_raises_sudden_change() {
        let store = Store::open_in_memory().unwrap();
        let (processor, mock) = processor(&glucose(10.0));
        processor.process(&store, &request(1), deadline()).unwrap();

        mock.set_response(&glucose(15.5));
        let outcome = processor.process(&store, &request(2), deadline()).unwrap();
        let record = &outcome.report.indicators["Glucose"];
        assert_eq!(record.status, IndicatorStatus::High);
        let sudden = record
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::SuddenChange)
            .unwrap();
        assert_eq!(sudden.severity, AlertSeverity::High);
    }

    #[test]
    fn later_reports_are_not_history_for_earlier_dates() {
        let store = Store::open_in_memory().unwrap();
        let (processor, mock) = processor(&glucose(5.0));
        processor.process(&store, &request(10), deadline()).unwrap();

        mock.set_response(&glucose(5.5));
        let outcome = processor.process(&store, &request(1), deadline()).unwrap();
        assert!(outcome.report.indicators["Glucose"].change.is_none());
    }

    #[test]
    fn unparseable_text_is_input_error_and_stores_nothing() {
        let store = Store::open_in_memory().unwrap();
        let (processor, _) = processor("I could not read this image.");
        let err = processor.process(&store, &request(1), deadline()).unwrap_err();
        assert!(matches!(err, ProcessingError::Parse(_)));
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(!err.is_retryable());
        let count = store.with_conn(repository::count_patients).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn extraction_failure_is_upstream() {
        let store = Store::open_in_memory().unwrap();
        let processor = ReportProcessor::new(
            Box::new(MockVisionClient::failing(ExtractionError::RateLimited {
                retry_after: Some(10),
            })),
            config(),
        )
        .unwrap();
        let err = processor.process(&store, &request(1), deadline()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert!(err.is_retryable());
    }

    #[test]
    fn expired_deadline_skips_extraction() {
        let store = Store::open_in_memory().unwrap();
        let (processor, mock) = processor(&glucose(5.0));
        let err = processor
            .process(&store, &request(1), Instant::now())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::DeadlineExceeded));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn bad_image_is_input_error() {
        let store = Store::open_in_memory().unwrap();
        let (processor, mock) = processor(&glucose(5.0));
        let mut req = request(1);
        req.image = ImageSource::Base64("%%%".into());
        let err = processor.process(&store, &req, deadline()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn missing_patient_fields_rejected_early() {
        let store = Store::open_in_memory().unwrap();
        let (processor, mock) = processor(&glucose(5.0));
        let mut req = request(1);
        req.patient.patient_id = " ".into();
        assert!(matches!(
            processor.process(&store, &req, deadline()),
            Err(ProcessingError::InvalidRequest(_))
        ));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn storage_errors_are_storage_category() {
        let err = ProcessingError::from(DatabaseError::LockPoisoned);
        assert_eq!(err.category(), ErrorCategory::Storage);
        let err = ProcessingError::from(IdentityError::EmptyFilter);
        assert_eq!(err.category(), ErrorCategory::Input);
    }
}
