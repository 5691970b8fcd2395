//! Load config from file and environment.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Peer configuration. File: ~/.config/regpeer/config.toml or /etc/regpeer/config.toml.
/// Env overrides: REGPEER_SHARED_DIR, REGPEER_ADDRESS_FAMILY.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory whose regular files are published (default `shared_files`).
    #[serde(default = "default_shared_dir")]
    pub shared_dir: PathBuf,
    /// Which resolved registry addresses to try (default any).
    #[serde(default)]
    pub address_family: AddressFamily,
}

fn default_shared_dir() -> PathBuf {
    PathBuf::from("shared_files")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shared_dir: default_shared_dir(),
            address_family: AddressFamily::default(),
        }
    }
}

/// Address family filter applied to resolved registry addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    Any,
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn admits(self, addr: &std::net::SocketAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::Ipv4 => addr.is_ipv4(),
            AddressFamily::Ipv6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for AddressFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(AddressFamily::Any),
            "ipv4" | "v4" | "inet" => Ok(AddressFamily::Ipv4),
            "ipv6" | "v6" | "inet6" => Ok(AddressFamily::Ipv6),
            other => Err(format!("unknown address family: {other}")),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressFamily::Any => "any",
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        })
    }
}

/// Load config: merge default, then config file (if present), then env vars.
/// Call after logging is set up; a bad file is reported and skipped.
pub fn load() -> Config {
    let c = load_file().unwrap_or_default();
    apply_env(c, |k| std::env::var(k).ok())
}

fn apply_env(mut c: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(s) = var("REGPEER_SHARED_DIR") {
        if !s.is_empty() {
            c.shared_dir = PathBuf::from(s);
        }
    }
    if let Some(s) = var("REGPEER_ADDRESS_FAMILY") {
        match s.parse() {
            Ok(f) => c.address_family = f,
            Err(e) => tracing::warn!(error = %e, "ignoring REGPEER_ADDRESS_FAMILY"),
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/regpeer/config.toml"));
    }
    out.push(PathBuf::from("/etc/regpeer/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            match std::fs::read_to_string(&p) {
                Ok(s) => match toml::from_str::<Config>(&s) {
                    Ok(c) => return Some(c),
                    Err(e) => {
                        tracing::warn!(path = %p.display(), error = %e, "invalid config file")
                    }
                },
                Err(e) => tracing::warn!(path = %p.display(), error = %e, "unreadable config file"),
            }
            break;
        }
    }
    None
}
