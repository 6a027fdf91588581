//! Observer App
//!
//! Process bootstrap shared by observer binaries: logging, wallet, settings.

use std::path::PathBuf;
use std::sync::Arc;

use observer_crypto::SigningKeypair;
use observer_logging::{LogFormat, LogLevel};
use observer_settings::{Settings, SettingsError};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("Keystore error: {0}")]
    Keystore(#[from] observer_keystore::KeystoreError),
}

/// Initialized application context.
pub struct App<T> {
    pub service: String,
    pub keypair: Arc<SigningKeypair>,
    pub settings: Settings<T>,
}

/// Builder for an [`App`].
pub struct AppBuilder<T> {
    service: String,
    log_level: LogLevel,
    log_format: LogFormat,
    skip_logging: bool,
    skip_banner: bool,
    config_path: Option<PathBuf>,
    wallet_path: Option<PathBuf>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Default> AppBuilder<T> {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Pretty,
            skip_logging: false,
            skip_banner: false,
            config_path: None,
            wallet_path: None,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.log_level = LogLevel::from_verbose(verbose);
        self
    }

    pub fn json_logs(mut self, json: bool) -> Self {
        self.log_format = if json { LogFormat::Json } else { LogFormat::Pretty };
        self
    }

    pub fn skip_logging(mut self) -> Self {
        self.skip_logging = true;
        self
    }

    pub fn skip_banner(mut self) -> Self {
        self.skip_banner = true;
        self
    }

    /// Settings file to use. A leading `~` expands to the home directory.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(observer_keystore::expand_path(&path.into()));
        self
    }

    /// Use an existing wallet instead of the generated default one.
    pub fn wallet_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wallet_path = Some(observer_keystore::expand_path(&path.into()));
        self
    }

    pub fn build(self) -> Result<App<T>, AppError> {
        if !self.skip_logging {
            // Already installed by an embedding process is fine.
            let _ = observer_logging::try_init(self.log_level, self.log_format);
        }

        let keypair = match &self.wallet_path {
            Some(path) => observer_keystore::load_keypair(path)?,
            None => {
                let path = observer_keystore::default_wallet_path_for(&self.service);
                observer_keystore::load_or_generate_keypair(&path)?
            }
        };

        let settings = Settings::load_or_default(&self.service, self.config_path.as_deref())?;

        if !self.skip_banner {
            info!(
                settings = %settings.path().display(),
                "{} {} starting, wallet: {}",
                self.service,
                env!("CARGO_PKG_VERSION"),
                keypair.address(),
            );
        }

        Ok(App {
            service: self.service,
            keypair: Arc::new(keypair),
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, Default)]
    struct TestConfig {
        value: u32,
    }

    #[test]
    fn test_app_builder_with_wallet() {
        let dir = std::env::temp_dir().join("observer-app-test");
        let _ = std::fs::remove_dir_all(&dir);
        let wallet = dir.join("wallet.key");
        let expected = observer_keystore::load_or_generate_keypair(&wallet).unwrap();

        let app: App<TestConfig> = AppBuilder::new("observer-app-test")
            .skip_logging()
            .skip_banner()
            .config_path(dir.join("settings.json"))
            .wallet_path(&wallet)
            .build()
            .unwrap();

        assert_eq!(app.service, "observer-app-test");
        assert_eq!(app.keypair.address(), expected.address());
        assert_eq!(app.settings.config.value, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_paths_expand_home() {
        let builder = AppBuilder::<TestConfig>::new("observer-app-test")
            .config_path("~/observer/settings.json")
            .wallet_path("/keys/wallet.key");
        let config = builder.config_path.as_deref().unwrap();
        assert!(!config.starts_with("~"));
        assert!(config.ends_with("observer/settings.json"));
        assert_eq!(builder.wallet_path, Some(PathBuf::from("/keys/wallet.key")));
    }

    #[test]
    fn test_missing_wallet_is_error() {
        let dir = std::env::temp_dir().join("observer-app-test-missing");
        let _ = std::fs::remove_dir_all(&dir);

        let result: Result<App<TestConfig>, AppError> = AppBuilder::new("observer-app-test")
            .skip_logging()
            .skip_banner()
            .config_path(dir.join("settings.json"))
            .wallet_path(dir.join("absent.key"))
            .build();
        assert!(matches!(result, Err(AppError::Keystore(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
