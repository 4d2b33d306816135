use events::BoxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Listener {position} for `{event}` failed: {source}")]
    Listener {
        event: String,
        position: usize,
        #[source]
        source: BoxError,
    },

    #[error("Listener {position} for `{event}` panicked")]
    ListenerPanicked { event: String, position: usize },

    #[error("Tried to invoke `{0}` but there were no listeners")]
    NoListeners(String),

    #[error("Tried to invoke `{event}` but there were {count} listeners")]
    AmbiguousListeners { event: String, count: usize },

    #[error("Cannot invoke `{0}` synchronously: its listener completes asynchronously")]
    AsyncListener(String),

    #[error("Cannot run `{0}` in parallel: no tokio runtime to spawn its listeners on")]
    NoRuntime(String),

    #[error("Host already defines flow members: {}", .names.join(", "))]
    CapabilityCollision { names: Vec<String> },
}

impl FlowError {
    /// Create a listener failure error.
    pub fn listener(event: impl Into<String>, position: usize, source: BoxError) -> Self {
        Self::Listener {
            event: event.into(),
            position,
            source,
        }
    }

    /// The error reported by the listener itself, if this is a listener failure.
    pub fn listener_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Listener { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FlowError::NoListeners("timestamp".to_string());
        assert!(error.to_string().contains("`timestamp`"));

        let error = FlowError::AmbiguousListeners {
            event: "timestamp".to_string(),
            count: 2,
        };
        assert!(error.to_string().contains("there were 2 listeners"));
    }

    #[test]
    fn test_listener_source() {
        let error = FlowError::listener("drink", 1, "oh no!".into());
        assert_eq!(error.listener_source().unwrap().to_string(), "oh no!");
        assert!(error.to_string().contains("Listener 1 for `drink`"));

        let error = FlowError::AsyncListener("sync".to_string());
        assert!(error.listener_source().is_none());
    }

    #[test]
    fn test_collision_lists_names() {
        let error = FlowError::CapabilityCollision {
            names: vec!["on".to_string(), "series".to_string()],
        };
        assert_eq!(error.to_string(), "Host already defines flow members: on, series");
    }
}
