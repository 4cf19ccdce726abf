//! Extraction engine: the HTTP client for the extraction service and the
//! tasks that poll a running job.
mod filename;
mod orchestrator;
mod persist;
mod service;
mod status_poller;
mod types;

pub use filename::artifact_filename;
pub use orchestrator::{ChannelEventSink, JobEventSink, JobHandle, Orchestrator, PollSettings};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use service::{
    ExtractionService, HttpExtractionService, ServiceSettings, SourceFile, SubmitRequest,
};
pub use status_poller::{StatusPoller, StatusStep};
pub use types::{
    ExtractError, ExtractedData, FailureKind, HealthResponse, JobEvent, PollFailure,
    ProgressResponse, ResultRow, ServiceError, SheetPayload, StatusResponse, SubmitResponse,
    UploadResponse,
};
