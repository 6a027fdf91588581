//! Observer Keystore
//!
//! Wallet key persistence and the platform directories the observer keeps
//! its state in. A wallet file holds the 32-byte ed25519 secret, either raw
//! or hex encoded.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use observer_crypto::SigningKeypair;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("Wallet not found at {0}")]
    NotFound(PathBuf),
    #[error("Failed to read wallet {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write wallet {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid wallet format: expected 32 raw bytes or 64 hex chars")]
    InvalidFormat,
}

pub type Result<T> = std::result::Result<T, KeystoreError>;

/// Load a wallet that must already exist.
pub fn load_keypair(path: &Path) -> Result<SigningKeypair> {
    if !path.exists() {
        return Err(KeystoreError::NotFound(path.to_path_buf()));
    }
    debug!("Loading wallet from {}", path.display());
    let bytes = fs::read(path).map_err(|source| KeystoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let secret = parse_secret(&bytes)?;
    Ok(SigningKeypair::from_secret_bytes(&secret))
}

/// Load the wallet at `path`, generating and saving a new one if absent.
pub fn load_or_generate_keypair(path: &Path) -> Result<SigningKeypair> {
    if path.exists() {
        return load_keypair(path);
    }
    let keypair = SigningKeypair::generate();
    save_keypair(path, &keypair)?;
    info!(
        address = %keypair.address(),
        "Generated new wallet at {}",
        path.display()
    );
    Ok(keypair)
}

/// Persist a wallet's raw secret, creating parent directories as needed.
///
/// On unix the file is readable by its owner only.
pub fn save_keypair(path: &Path, keypair: &SigningKeypair) -> Result<()> {
    let write_err = |source| KeystoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(write_err)?;
    file.write_all(&keypair.secret_key_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)
}

fn parse_secret(bytes: &[u8]) -> Result<[u8; 32]> {
    if let Ok(raw) = <[u8; 32]>::try_from(bytes) {
        return Ok(raw);
    }
    let text = std::str::from_utf8(bytes).map_err(|_| KeystoreError::InvalidFormat)?;
    let decoded = hex::decode(text.trim()).map_err(|_| KeystoreError::InvalidFormat)?;
    <[u8; 32]>::try_from(decoded.as_slice()).map_err(|_| KeystoreError::InvalidFormat)
}

/// Default wallet location for a service.
///
/// - Linux: `$XDG_DATA_HOME/{service}/keys/wallet.key`
/// - macOS: `~/Library/Application Support/{service}/keys/wallet.key`
pub fn default_wallet_path_for(service: &str) -> PathBuf {
    data_dir(service).join("keys").join("wallet.key")
}

/// Default config directory for a service.
pub fn default_config_dir_for(service: &str) -> PathBuf {
    platform_dir(service, "XDG_CONFIG_HOME", &[".config"])
}

/// Default data directory for a service.
pub fn data_dir(service: &str) -> PathBuf {
    platform_dir(service, "XDG_DATA_HOME", &[".local", "share"])
}

#[cfg(target_os = "macos")]
fn platform_dir(service: &str, _xdg_var: &str, _fallback: &[&str]) -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join(service)
}

#[cfg(not(target_os = "macos"))]
fn platform_dir(service: &str, xdg_var: &str, fallback: &[&str]) -> PathBuf {
    let base = std::env::var(xdg_var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| fallback.iter().fold(home_dir(), |dir, part| dir.join(part)));
    base.join(service.to_lowercase())
}

/// Expand a leading `~` component to the home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_load_wallet() {
        let dir = std::env::temp_dir().join("observer-keystore-test");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("wallet.key");

        let kp1 = load_or_generate_keypair(&path).unwrap();
        let kp2 = load_or_generate_keypair(&path).unwrap();
        assert_eq!(kp2.address(), kp1.address());

        let kp3 = load_keypair(&path).unwrap();
        assert_eq!(kp3.public_key_bytes(), kp1.public_key_bytes());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_wallet() {
        let path = std::env::temp_dir().join("observer-keystore-missing/wallet.key");
        let result = load_keypair(&path);
        assert!(matches!(result, Err(KeystoreError::NotFound(_))));
    }

    #[test]
    fn test_hex_wallet() {
        let dir = std::env::temp_dir().join("observer-keystore-test-hex");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wallet.key");
        fs::write(&path, format!("{}\n", hex::encode([9u8; 32]))).unwrap();

        let kp = load_keypair(&path).unwrap();
        assert_eq!(kp.secret_key_bytes(), [9u8; 32]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_wallet_format() {
        let dir = std::env::temp_dir().join("observer-keystore-test-invalid");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.key");
        fs::write(&path, b"too short").unwrap();

        let result = load_keypair(&path);
        assert!(matches!(result, Err(KeystoreError::InvalidFormat)));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_paths() {
        let wallet = default_wallet_path_for("observer");
        assert!(wallet.ends_with("keys/wallet.key"));
        assert!(!default_config_dir_for("observer").as_os_str().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_wallet_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join("observer-keystore-test-mode");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("wallet.key");

        load_or_generate_keypair(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "wallet mode {:o}", mode & 0o777);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_expand_path() {
        let expanded = expand_path(Path::new("~/wallet.key"));
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with("wallet.key"));
        assert_eq!(
            expand_path(Path::new("/abs/wallet.key")),
            PathBuf::from("/abs/wallet.key")
        );
        assert_eq!(expand_path(Path::new("~other/x")), PathBuf::from("~other/x"));
    }
}
