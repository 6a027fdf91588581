//! Observer configuration, persisted through the settings file.

use serde::{Deserialize, Serialize};

use crate::producer::EpochSettings;

/// Settings file contents for the observer daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObserverConfig {
    /// When false the daemon exits without publishing.
    pub run_observer: bool,
    /// Gateway used for GraphQL lookups and network height.
    pub gateway_url: String,
    /// Turbo upload service.
    pub upload_url: String,
    /// Turbo payment service, for credit balance.
    pub payment_url: String,
    pub epoch_zero_start_height: u64,
    pub epoch_blocks_length: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            run_observer: true,
            gateway_url: "https://ar-io.dev".into(),
            upload_url: "https://upload.ardrive.io".into(),
            payment_url: "https://payment.ardrive.io".into(),
            epoch_zero_start_height: 0,
            epoch_blocks_length: 720,
            request_timeout_secs: 30,
        }
    }
}

impl ObserverConfig {
    /// Apply `OBSERVER_*` overrides from `lookup` (normally the process env).
    ///
    /// Unparseable boolean values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(run) = lookup("OBSERVER_RUN_OBSERVER").and_then(|v| parse_bool(&v)) {
            self.run_observer = run;
        }
        if let Some(url) = lookup("OBSERVER_GATEWAY_URL") {
            self.gateway_url = url;
        }
        if let Some(url) = lookup("OBSERVER_UPLOAD_URL") {
            self.upload_url = url;
        }
        if let Some(url) = lookup("OBSERVER_PAYMENT_URL") {
            self.payment_url = url;
        }
    }

    pub fn epoch_settings(&self) -> EpochSettings {
        EpochSettings {
            epoch_zero_start_height: self.epoch_zero_start_height,
            epoch_blocks_length: self.epoch_blocks_length,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let cfg = ObserverConfig::default();
        assert!(cfg.run_observer);
        assert_eq!(cfg.epoch_blocks_length, 720);
        assert_eq!(cfg.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg: ObserverConfig =
            serde_json::from_str(r#"{"gatewayUrl":"http://localhost:3000"}"#).unwrap();
        assert_eq!(cfg.gateway_url, "http://localhost:3000");
        assert_eq!(cfg.upload_url, ObserverConfig::default().upload_url);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OBSERVER_RUN_OBSERVER", "false"),
            ("OBSERVER_GATEWAY_URL", "http://gw"),
        ]);
        let mut cfg = ObserverConfig::default();
        cfg.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert!(!cfg.run_observer);
        assert_eq!(cfg.gateway_url, "http://gw");
        assert_eq!(cfg.payment_url, ObserverConfig::default().payment_url);
    }

    #[test]
    fn test_bad_bool_ignored() {
        let mut cfg = ObserverConfig::default();
        cfg.apply_env_overrides(|k| (k == "OBSERVER_RUN_OBSERVER").then(|| "maybe".to_string()));
        assert!(cfg.run_observer);
    }
}
