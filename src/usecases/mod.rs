//! Use cases. Application services orchestrating ports and domain rules.

pub mod access_gate;
pub mod gateway_service;
pub mod job_client;
pub mod projection;

pub use access_gate::{decide_access, Access};
pub use gateway_service::{
    ChannelQuery, CreateRequestInput, GatewayService, PollOutcome, ReportListing, ReportSummary,
    ResultListing, ShapedResult,
};
pub use job_client::{JobClient, JobState};
pub use projection::{
    project, project_full, project_preview, ProjectedResult, ResultFullDto, ResultPreviewDto,
};
