//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    AnalysisPayload, AnalysisRequest, AnalysisResult, CharacteristicPost, Insight,
    NewAnalysisRequest, ReportLanguage, RequestStatus, Requester, normalize_channel,
    validate_depth, ANONYMOUS_OWNER, MAX_DEPTH, MIN_DEPTH,
};
pub use errors::DomainError;
