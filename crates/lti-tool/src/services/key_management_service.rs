use crate::config::Config;
use crate::crypto::KeyManager;
use crate::errors::LtiError;
use common::secret::{ExposeSecret, SecretString};

/// Build the tool's key manager at startup.
///
/// Loads `TOOL_PRIVATE_KEY_PATH` when configured so the published key
/// survives restarts; otherwise generates a fresh keypair, which platforms
/// will only pick up after re-reading `/.well-known/jwks.json`.
pub async fn initialize_key_manager(config: &Config) -> Result<KeyManager, LtiError> {
    let kid = config.key_id.clone();

    match &config.private_key_path {
        Some(path) => {
            let pem = tokio::fs::read_to_string(path)
                .await
                .map(SecretString::from)
                .map_err(|e| {
                    LtiError::Crypto(format!("Failed to read private key file {}: {}", path, e))
                })?;
            let manager = KeyManager::from_pem(&kid, pem.expose_secret())?;
            tracing::info!(target: "lti.crypto", kid = %kid, "Loaded signing key from file");
            Ok(manager)
        }
        None => {
            // RSA key generation takes long enough to stall a runtime worker
            let manager = tokio::task::spawn_blocking(move || KeyManager::generate(&kid))
                .await
                .map_err(|e| LtiError::Crypto(format!("Key generation task failed: {}", e)))??;
            tracing::info!(target: "lti.crypto", kid = %manager.kid(), "Generated ephemeral signing key");
            Ok(manager)
        }
    }
}
