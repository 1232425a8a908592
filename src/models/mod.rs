pub mod enums;
pub mod indicator;
pub mod patient;
pub mod report;

pub use indicator::*;
pub use patient::*;
pub use report::*;
