//! Host keys presented by the honeypot.

use {
    crate::error::{HoneypotError, Result},
    log::info,
    russh_keys::key::KeyPair,
    std::path::PathBuf,
};

/// Load every key in `paths`, or generate a fresh ed25519 key if there are none.
///
/// Keys are unencrypted private key files in any format russh understands.
pub fn load_host_keys(paths: &[PathBuf]) -> Result<Vec<KeyPair>> {
    if paths.is_empty() {
        let key = KeyPair::generate_ed25519().ok_or(HoneypotError::KeyGeneration)?;
        info!("Added host key to the configuration ({})", key.name());
        return Ok(vec![key]);
    }

    paths
        .iter()
        .map(|path| {
            let key = russh_keys::load_secret_key(path, None).map_err(|e| {
                HoneypotError::HostKey {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            info!(
                "Added host key to the configuration ({}) from {}",
                key.name(),
                path.display()
            );
            Ok(key)
        })
        .collect()
}
