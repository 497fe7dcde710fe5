//! Service configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the audited ledger service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Signer identity stamped on local registry records
    pub local_signer: String,
    /// Signer identity stamped on continental registry records
    pub continental_signer: String,
    /// Pending transactions older than this are expired and refunded
    pub pending_timeout: Duration,
    /// How often the watcher sweeps for expired transactions
    pub expiry_check_interval: Duration,
    /// Currency code stamped on transactions
    pub currency: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            local_signer: "node_local".to_string(),
            continental_signer: "node_continental".to_string(),
            pending_timeout: Duration::from_secs(15 * 60),
            expiry_check_interval: Duration::from_secs(60),
            currency: "CREDITS".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pending_timeout_is_fifteen_minutes() {
        let config = ServiceConfig::default();
        assert_eq!(config.pending_timeout, Duration::from_secs(900));
        assert_eq!(config.local_signer, "node_local");
        assert_eq!(config.continental_signer, "node_continental");
    }
}
