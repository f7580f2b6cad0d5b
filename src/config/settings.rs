//! Stored extension settings.
//!
//! Mirrors the JSON the options page persists:
//!
//! ```json
//! { "forwardUrl": "ws://localhost:4455", "wsPassword": "" }
//! ```

use serde::{Deserialize, Serialize};

/// Settings as persisted by the options page. Both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    /// Control-server URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_url: Option<String>,

    /// Control-server password. Empty means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings() {
        let settings: StoredSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, StoredSettings::default());
        assert_eq!(serde_json::to_string(&settings).unwrap(), "{}");
    }
}
