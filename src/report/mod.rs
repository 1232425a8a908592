pub mod assembler;
pub mod summary;

pub use assembler::{assemble_report, assemble_report_at, ReportDraft};
pub use summary::build_patient_summary;
