use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// Failures the pipeline does not recover from.
///
/// Missing-data conditions (absent log fields, tests without a result,
/// missing coverage tags) are logged and never surface here.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("execution log references VM '{0}' which is not declared in the suite")]
    UndeclaredVm(String),

    #[error("performance sample for '{test}' is missing metric '{key}'")]
    MissingMetric { test: String, key: String },

    #[error("metric '{key}' of '{test}' is not numeric: {value}")]
    InvalidMetric {
        test: String,
        key: String,
        value: String,
    },

    #[error("malformed timestamp '{0}' (expected M/D/Y date as first token)")]
    MalformedTimestamp(String),

    #[error("unknown performance suite '{0}'")]
    UnknownPerfSuite(String),

    #[error("performance suite '{suite}' declares {count} test cases, exactly one is supported")]
    AmbiguousPerfSuite { suite: String, count: usize },

    #[error("suite definition has not been loaded")]
    SuiteNotLoaded,
}
