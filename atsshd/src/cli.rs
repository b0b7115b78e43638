use {
    atsshd_retaliation::config::validate_banner,
    clap::{App, Arg},
    std::{net::IpAddr, str::FromStr},
};

// ── Validators ──────────────────────────────────────────────────────
fn is_parsable<T: FromStr>(value: String) -> Result<(), String> {
    value
        .parse::<T>()
        .map(|_| ())
        .map_err(|_| format!("unable to parse {value:?}"))
}

fn is_banner(value: String) -> Result<(), String> {
    validate_banner(&value).map_err(|e| e.to_string())
}

fn is_duration(value: String) -> Result<(), String> {
    humantime::parse_duration(&value)
        .map(|_| ())
        .map_err(|e| format!("invalid duration {value:?}: {e}"))
}

// ── App Definition (clap) ───────────────────────────────────────────
pub fn app<'a, 'b>(version: &'b str) -> App<'a, 'b> {
    App::new("atsshd")
        .about("SSH honeypot that tries captured passwords against the hosts that sent them")
        .version(version)
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("PATH")
                .takes_value(true)
                .help("YAML config file; command-line flags override its values"),
        )
        .arg(
            Arg::with_name("attack")
                .short("A")
                .long("attack")
                .help("Replay captured passwords against the client that sent them"),
        )
        .arg(
            Arg::with_name("banner")
                .short("b")
                .long("banner")
                .value_name("BANNER")
                .takes_value(true)
                .validator(is_banner)
                .help("SSH identification string presented to clients and used when attacking [default: SSH-2.0-OpenSSH_6.1p2]"),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .takes_value(true)
                .validator(is_parsable::<u16>)
                .help("Port to listen on [default: 22]"),
        )
        .arg(
            Arg::with_name("bind")
                .long("bind")
                .value_name("IP")
                .takes_value(true)
                .validator(is_parsable::<IpAddr>)
                .help("Address to listen on [default: 0.0.0.0]"),
        )
        .arg(
            Arg::with_name("log")
                .short("l")
                .long("log")
                .value_name("PATH")
                .takes_value(true)
                .help("Also write log output to this file; SIGUSR1 reopens it"),
        )
        .arg(
            Arg::with_name("log_filter")
                .long("log-filter")
                .value_name("FILTER")
                .takes_value(true)
                .help("env_logger filter used when RUST_LOG is unset"),
        )
        .arg(
            Arg::with_name("host_key")
                .short("k")
                .long("host-key")
                .value_name("PATH")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Private host key file; repeat for several keys. An ed25519 key is generated when none is given"),
        )
        .arg(
            Arg::with_name("target_port")
                .long("target-port")
                .value_name("PORT")
                .takes_value(true)
                .validator(is_parsable::<u16>)
                .help("Port attacked hosts are connected to [default: 22]"),
        )
        .arg(
            Arg::with_name("idle_timeout")
                .long("idle-timeout")
                .value_name("DURATION")
                .takes_value(true)
                .validator(is_duration)
                .help("Quiet period after which a host's worker is dropped [default: 1h]"),
        )
        .arg(
            Arg::with_name("failure_threshold")
                .long("failure-threshold")
                .value_name("COUNT")
                .takes_value(true)
                .validator(is_parsable::<u32>)
                .help("Consecutive connect failures before a host is no longer attacked [default: 3]"),
        )
        .arg(
            Arg::with_name("connect_timeout")
                .long("connect-timeout")
                .value_name("DURATION")
                .takes_value(true)
                .validator(is_duration)
                .help("Timeout for the outbound TCP connection [default: 20s]"),
        )
        .arg(
            Arg::with_name("handshake_timeout")
                .long("handshake-timeout")
                .value_name("DURATION")
                .takes_value(true)
                .validator(is_duration)
                .help("Timeout for the outbound SSH handshake and login [default: 30s]"),
        )
        .arg(
            Arg::with_name("allow")
                .long("allow")
                .value_name("IP")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .validator(is_parsable::<IpAddr>)
                .help("Never attack this address; repeatable. Loopback is always protected"),
        )
}

#[cfg(test)]
mod tests {
    use {super::*, clap::ErrorKind};

    #[test]
    fn test_flags_parse() {
        let matches = app("0.0.0")
            .get_matches_from_safe(vec![
                "atsshd",
                "-A",
                "-p",
                "2222",
                "-k",
                "/etc/ssh/ssh_host_rsa_key",
                "-k",
                "/etc/ssh/ssh_host_ed25519_key",
                "--allow",
                "192.0.2.1",
            ])
            .unwrap();
        assert!(matches.is_present("attack"));
        assert_eq!(matches.value_of("port"), Some("2222"));
        assert_eq!(matches.values_of("host_key").unwrap().count(), 2);
        assert_eq!(matches.value_of("allow"), Some("192.0.2.1"));
    }

    #[test]
    fn test_bad_banner_rejected() {
        let err = app("0.0.0")
            .get_matches_from_safe(vec!["atsshd", "-b", "OpenSSH"])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueValidation);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let err = app("0.0.0")
            .get_matches_from_safe(vec!["atsshd", "--idle-timeout", "soon"])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueValidation);
    }
}
