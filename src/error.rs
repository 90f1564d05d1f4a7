//! Error and diagnostic types
//!
//! Nothing in the generation core is fatal. Recoverable problems become a
//! [`Diagnostic`], which is logged and kept on the level for inspection.

use thiserror::Error;

/// Failures while loading configuration or scenario data from disk
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file was not valid JSON for the expected shape
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Preconditions checked immediately before a segment is mutated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Index is outside the planned segment list
    #[error("segment {0} does not exist")]
    SegmentMissing(u32),

    /// The level has been torn down
    #[error("level has been torn down")]
    TornDown,
}

/// A recovered problem; generation always continues after one of these
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A tunable was out of range and has been clamped
    #[error("config value `{field}` clamped from {from} to {to}")]
    ConfigClamped { field: &'static str, from: f32, to: f32 },

    /// Populate was requested for a segment that already has content
    #[error("segment {segment} already generated, populate skipped")]
    AlreadyGenerated { segment: u32 },

    /// A request referenced a segment that is not part of the level
    #[error("segment {segment} missing, request dropped")]
    SegmentMissing { segment: u32 },

    /// A request arrived after teardown
    #[error("level torn down, request for segment {segment} dropped")]
    TornDown { segment: u32 },

    /// Unknown archetype code, default archetype used instead
    #[error("unknown archetype `{code}`, using `{fallback}`")]
    CatalogMiss { code: String, fallback: &'static str },

    /// The navigation capability could not produce a path
    #[error("navigation failed for enemy {segment}:{ordinal}")]
    NavigationFailed { segment: u32, ordinal: u32 },
}

impl Diagnostic {
    /// Log this diagnostic at warn level
    pub fn report(&self) {
        log::warn!("{self}");
    }
}
