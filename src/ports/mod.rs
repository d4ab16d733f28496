//! Port traits. API boundaries for the hexagon.
//!
//! - Outbound: called by use cases into infrastructure (CMS, auth provider)
//! - Client: called by the job lifecycle client into a running gateway

pub mod client;
pub mod outbound;

pub use client::{AnalyzerApi, PollSnapshot, Submission};
pub use outbound::{CmsPort, ResultFilter, ResultPage, SessionPort};
