use reqwest::StatusCode;

/// Outcome of a connection check.
///
/// Credential rejection, transport failure and any other response are kept
/// apart so callers never mistake an unreachable camera for a wrong
/// password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The device answered 200 to the authenticated permission request.
    Authenticated,
    /// The device answered 401 after the digest exchange.
    InvalidCredentials,
    /// The device answered with any other status.
    UnexpectedStatus(StatusCode),
    /// No response within the connection check timeout.
    TimedOut,
    /// The connection could not be established or broke (refused, DNS, TLS).
    ConnectionFailed(String),
}

impl ConnectionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, ConnectionStatus::Authenticated)
    }

    /// Returns true when no HTTP response was received.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, ConnectionStatus::TimedOut | ConnectionStatus::ConnectionFailed(_))
    }
}
