#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum TumorboardError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("{variant} does not classify as a supported point mutation (got: {classified_type})")]
    UnsupportedVariantType {
        variant: String,
        classified_type: String,
    },

    #[error("transport error from {source_name}: {message}")]
    Transport { source_name: String, message: String },

    #[error("parse error from {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("LLM adjudication failed: {message}\n\nraw reply:\n{raw_reply}")]
    AdjudicationError { message: String, raw_reply: String },

    #[error("failed to obtain curated biomarker cache: {message}")]
    CacheDownload { message: String },

    #[error(
        "API key required: {api} requires {env_var} environment variable.\n\nTo set:\n  export {env_var}=your-key"
    )]
    ApiKeyRequired { api: String, env_var: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
