//! Optional YAML config file.
//!
//! Every field is optional; a missing field keeps the built-in default and any
//! command-line flag wins over the file. Durations use humantime syntax
//! (`90s`, `1h 30m`).
//!
//! ```yaml
//! attack: true
//! port: 2222
//! host_keys:
//!   - /etc/atsshd/ssh_host_ed25519_key
//! idle_timeout: 30m
//! allow:
//!   - 192.0.2.10
//! ```

use {
    serde::Deserialize,
    std::{fs::File, net::IpAddr, path::PathBuf},
    thiserror::Error,
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub attack: Option<bool>,
    pub banner: Option<String>,
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub log: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub host_keys: Vec<PathBuf>,
    pub target_port: Option<u16>,
    pub idle_timeout: Option<String>,
    pub failure_threshold: Option<u32>,
    pub connect_timeout: Option<String>,
    pub handshake_timeout: Option<String>,
    pub cred_backlog: Option<usize>,
    pub allow: Vec<IpAddr>,
}

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("unable to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigFile {
    pub fn load(path: &str) -> Result<Self, ConfigFileError> {
        let file = File::open(path).map_err(|source| ConfigFileError::Io {
            path: path.to_string(),
            source,
        })?;
        serde_yaml::from_reader(file).map_err(|source| ConfigFileError::Yaml {
            path: path.to_string(),
            source,
        })
    }
}
