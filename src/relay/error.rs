//! Relay error definitions.

use std::io;

use thiserror::Error;

/// Errors that end a session or abort a step of one.
///
/// Only the `Remote*` and `RemoteTimeouts` kinds tear down the shared backend
/// connection; client-side errors stay local to their session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The backend could not be reached (refused, reset, timed out).
    #[error("Error connecting to remote server {address}: {source}")]
    BackendConnect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Error reading from client: {0}")]
    ClientRead(#[source] io::Error),

    #[error("Error writing to client: {0}")]
    ClientWrite(#[source] io::Error),

    #[error("Error reading from remote server: {0}")]
    RemoteRead(#[source] io::Error),

    #[error("Error writing to remote server: {0}")]
    RemoteWrite(#[source] io::Error),

    /// The backend stayed silent for too many consecutive requests.
    #[error("For {0} times no data received from remote server")]
    RemoteTimeouts(u32),
}

impl RelayError {
    /// Whether this error means the shared connection can no longer be trusted.
    pub fn poisons_remote(&self) -> bool {
        matches!(
            self,
            RelayError::BackendConnect { .. }
                | RelayError::RemoteRead(_)
                | RelayError::RemoteWrite(_)
                | RelayError::RemoteTimeouts(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_do_not_poison_remote() {
        let err = RelayError::ClientWrite(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(!err.poisons_remote());
        assert!(RelayError::RemoteTimeouts(5).poisons_remote());
    }

    #[test]
    fn timeout_streak_message() {
        assert_eq!(
            RelayError::RemoteTimeouts(5).to_string(),
            "For 5 times no data received from remote server"
        );
    }
}
