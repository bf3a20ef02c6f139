//! Shared transport-error mapping for the live connectors.

use crate::ConnectorError;

/// Map a reqwest failure into the connector taxonomy: connect failures are
/// `Unavailable`, elapsed deadlines are `Timeout`, everything else is
/// reported as unavailable with the transport message.
pub(crate) fn map_transport(e: reqwest::Error, timeout_secs: u64) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::Timeout(timeout_secs)
    } else if e.is_connect() {
        ConnectorError::Unavailable(format!("connection failed: {}", e))
    } else {
        ConnectorError::Unavailable(e.to_string())
    }
}
