use project::ProjectError;
use thiserror::Error;

use crate::assets::AssetLoadError;

/// Failures reported synchronously to the engine's host.
///
/// None of these stop a running tick loop; shader compile faults are reported
/// through telemetry instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Configuration(String),

    #[error("{what} limit reached (maximum {max})")]
    Capacity { what: &'static str, max: usize },

    #[error("failed to load texture asset `{id}`: {source}")]
    AssetLoad {
        id: String,
        #[source]
        source: AssetLoadError,
    },

    #[error("graphics backend failure: {0:#}")]
    Backend(anyhow::Error),
}

impl From<ProjectError> for EngineError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::Capacity { what, max } => Self::Capacity { what, max },
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_errors_keep_their_kind() {
        let capacity = EngineError::from(ProjectError::Capacity {
            what: "texture",
            max: 8,
        });
        assert!(matches!(capacity, EngineError::Capacity { what: "texture", max: 8 }));

        let missing = EngineError::from(ProjectError::MissingField("buffers"));
        match missing {
            EngineError::Configuration(message) => assert!(message.contains("buffers")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
