use thiserror::Error;

/// Failure taxonomy for one pipeline invocation. Every stage maps its
/// provider errors onto exactly one of these kinds; the HTTP boundary
/// collapses all of them into a generic failure response and keeps the
/// detail in the server-side logs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Empty or otherwise unusable query. Rejected at the boundary, never
    /// reaches the router.
    #[error("invalid query: {0}")]
    Validation(String),

    /// The classifier answered, but not with the expected structure.
    #[error("routing failure: {0}")]
    RoutingFailure(String),

    /// The classification provider could not be reached or errored.
    #[error("classification service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Embedding or vector-store failure during retrieval.
    #[error("retrieval failure: {0}")]
    RetrievalFailure(String),

    /// Generation failure, or a generated answer that failed citation
    /// validation.
    #[error("synthesis failure: {0}")]
    SynthesisFailure(String),

    /// A routed topic has no registered partition. Deployment defect, not
    /// a per-request condition.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The whole invocation ran past its deadline.
    #[error("pipeline deadline exceeded after {0}s")]
    DeadlineExceeded(u64),
}

impl PipelineError {
    /// Fatal errors indicate a broken deployment and should page someone;
    /// everything else is recoverable by retrying the invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Short stable label for log fields and alerting filters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::RoutingFailure(_) => "routing_failure",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::RetrievalFailure(_) => "retrieval_failure",
            Self::SynthesisFailure(_) => "synthesis_failure",
            Self::Configuration(_) => "configuration",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }
}
