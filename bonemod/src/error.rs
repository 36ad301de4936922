use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("save version {version} is not supported")]
    UnsupportedVersion { version: i32 },

    #[error("missing extended data key '{key}'")]
    MissingKey { key: String },

    #[error("failed to decode bone modifier data: {message}")]
    Decode { message: String },

    #[error("failed to decompress bone modifier data: {message}")]
    Decompress { message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("modifier for bone '{bone}' at {location} already exists")]
    DuplicateModifier { bone: String, location: String },

    #[error("scene node handle is stale or unknown")]
    UnknownNode,

    #[cfg(feature = "json")]
    #[error("failed to parse JSON: {message}")]
    Json { message: String },
}
