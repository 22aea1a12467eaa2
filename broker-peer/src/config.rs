use serde::{Deserialize, Serialize};

/// Everything a peer needs to find the broker.
///
/// Names must be unique across the deployment and are case-sensitive; the broker does not
/// enforce uniqueness itself — re-registration under the same name just overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub request_address: String,
    pub service_address: String,
    pub submit_values_address: String,
    pub new_values_address: String,
}
