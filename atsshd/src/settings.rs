//! Effective runtime settings: built-in defaults, then the config file, then
//! command-line flags.

use {
    crate::config_file::ConfigFile,
    anyhow::{Context, Result},
    atsshd_honeypot::HoneypotConfig,
    atsshd_logger::DEFAULT_FILTER,
    atsshd_retaliation::{AllowList, RetaliationConfig},
    clap::ArgMatches,
    std::{
        net::{IpAddr, Ipv4Addr, Ipv6Addr},
        path::PathBuf,
        str::FromStr,
        time::Duration,
    },
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub attack: bool,
    pub log_file: Option<PathBuf>,
    pub log_filter: String,
    pub honeypot: HoneypotConfig,
    pub retaliation: RetaliationConfig,
    pub allow_list: AllowList,
}

fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).with_context(|| format!("invalid {name} {value:?}"))
}

fn flag<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("invalid --{} {value:?}", name.replace('_', "-")))
        })
        .transpose()
}

impl Settings {
    /// Read `--config` if given and merge the flags over it.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let file = match matches.value_of("config") {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file, matches)
    }

    pub fn resolve(file: ConfigFile, matches: &ArgMatches) -> Result<Self> {
        let mut honeypot = HoneypotConfig::default();
        let mut retaliation = RetaliationConfig::default();

        // ── Config file ─────────────────────────────────────────────
        if let Some(banner) = file.banner {
            honeypot.banner.clone_from(&banner);
            retaliation.banner = banner;
        }
        if let Some(port) = file.port {
            honeypot.bind_addr.set_port(port);
        }
        if let Some(ip) = file.bind {
            honeypot.bind_addr.set_ip(ip);
        }
        honeypot.host_key_files = file.host_keys;
        if let Some(port) = file.target_port {
            retaliation.target_port = port;
        }
        if let Some(value) = &file.idle_timeout {
            retaliation.idle_timeout = parse_duration("idle_timeout", value)?;
        }
        if let Some(threshold) = file.failure_threshold {
            retaliation.failure_threshold = threshold;
        }
        if let Some(value) = &file.connect_timeout {
            retaliation.connect_timeout = parse_duration("connect_timeout", value)?;
        }
        if let Some(value) = &file.handshake_timeout {
            retaliation.handshake_timeout = parse_duration("handshake_timeout", value)?;
        }
        if let Some(backlog) = file.cred_backlog {
            retaliation.cred_backlog = backlog;
        }
        let mut allowed = file.allow;
        let mut attack = file.attack.unwrap_or(false);
        let mut log_file = file.log;
        let mut log_filter = file.log_filter.unwrap_or_else(|| DEFAULT_FILTER.to_string());

        // ── Flags ───────────────────────────────────────────────────
        if matches.is_present("attack") {
            attack = true;
        }
        if let Some(banner) = matches.value_of("banner") {
            honeypot.banner = banner.to_string();
            retaliation.banner = banner.to_string();
        }
        if let Some(port) = flag::<u16>(matches, "port")? {
            honeypot.bind_addr.set_port(port);
        }
        if let Some(ip) = flag::<IpAddr>(matches, "bind")? {
            honeypot.bind_addr.set_ip(ip);
        }
        if let Some(path) = matches.value_of("log") {
            log_file = Some(PathBuf::from(path));
        }
        if let Some(filter) = matches.value_of("log_filter") {
            log_filter = filter.to_string();
        }
        if let Some(paths) = matches.values_of("host_key") {
            honeypot.host_key_files = paths.map(PathBuf::from).collect();
        }
        if let Some(port) = flag::<u16>(matches, "target_port")? {
            retaliation.target_port = port;
        }
        if let Some(value) = matches.value_of("idle_timeout") {
            retaliation.idle_timeout = parse_duration("--idle-timeout", value)?;
        }
        if let Some(threshold) = flag::<u32>(matches, "failure_threshold")? {
            retaliation.failure_threshold = threshold;
        }
        if let Some(value) = matches.value_of("connect_timeout") {
            retaliation.connect_timeout = parse_duration("--connect-timeout", value)?;
        }
        if let Some(value) = matches.value_of("handshake_timeout") {
            retaliation.handshake_timeout = parse_duration("--handshake-timeout", value)?;
        }
        if let Some(values) = matches.values_of("allow") {
            for value in values {
                allowed.push(value.parse().with_context(|| format!("invalid --allow {value:?}"))?);
            }
        }

        honeypot.validate().context("invalid honeypot settings")?;
        retaliation.validate().context("invalid retaliation settings")?;

        let allow_list = AllowList::new(
            [
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ]
            .into_iter()
            .chain(allowed),
        );

        Ok(Self {
            attack,
            log_file,
            log_filter,
            honeypot,
            retaliation,
            allow_list,
        })
    }
}
