use thiserror::Error;

/// Errors that can occur during service lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// No attached System exposes the requested service type
    #[error("No attached System provides service `{service}`")]
    UnknownService { service: &'static str },
}
