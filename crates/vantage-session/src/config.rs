use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Session configuration, assembled from built-in defaults, an optional TOML
/// file, and CLI flags, in that precedence order (CLI wins, file overrides
/// defaults, per §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub domains: Vec<String>,
    pub domains_file: Option<PathBuf>,
    pub asns: Vec<u32>,
    pub ips: Vec<IpAddr>,
    pub cidrs: Vec<IpNetwork>,
    pub ports: Vec<u16>,

    pub active: bool,
    pub brute_force: bool,
    pub no_recursive: bool,
    pub no_alts: bool,
    pub wordlist: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub max_dns_queries_per_sec: u32,
    pub verbosity: u8,
    pub list_only: bool,
    pub whois: bool,
    pub timeout_minutes: Option<u64>,

    pub resolvers: Vec<String>,
    pub blacklist_cidrs: Vec<IpNetwork>,
    pub ttl_windows: HashMap<String, u64>,
    pub rate_limits: HashMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            domains: Vec::new(),
            domains_file: None,
            asns: Vec::new(),
            ips: Vec::new(),
            cidrs: Vec::new(),
            ports: Vec::new(),
            active: false,
            brute_force: false,
            no_recursive: false,
            no_alts: false,
            wordlist: None,
            output_file: None,
            max_dns_queries_per_sec: 0,
            verbosity: 0,
            list_only: false,
            whois: false,
            timeout_minutes: None,
            resolvers: Vec::new(),
            blacklist_cidrs: Vec::new(),
            ttl_windows: HashMap::new(),
            rate_limits: HashMap::new(),
        }
    }
}

/// The platform-appropriate default config file location, used when `-config`
/// is not passed on the command line.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vantage")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Loads a TOML configuration file and merges it over the built-in
    /// defaults (file values take precedence over defaults, never over CLI
    /// flags, per §6).
    pub async fn load_file(path: &Path) -> anyhow::Result<Config> {
        let contents = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Merges `cli` over `self` (the file/defaults layer): any non-default,
    /// explicitly-set CLI field wins. Vec/HashMap fields are merged by
    /// shadowing when the CLI value is non-empty.
    pub fn merge_cli(mut self, cli: CliOverrides) -> Config {
        if !cli.domains.is_empty() {
            self.domains = cli.domains;
        }
        if cli.domains_file.is_some() {
            self.domains_file = cli.domains_file;
        }
        if !cli.asns.is_empty() {
            self.asns = cli.asns;
        }
        if !cli.ips.is_empty() {
            self.ips = cli.ips;
        }
        if !cli.cidrs.is_empty() {
            self.cidrs = cli.cidrs;
        }
        if !cli.ports.is_empty() {
            self.ports = cli.ports;
        }
        self.active |= cli.active;
        self.brute_force |= cli.brute_force;
        self.no_recursive |= cli.no_recursive;
        self.no_alts |= cli.no_alts;
        if cli.wordlist.is_some() {
            self.wordlist = cli.wordlist;
        }
        if cli.output_file.is_some() {
            self.output_file = cli.output_file;
        }
        if cli.max_dns_queries_per_sec > 0 {
            self.max_dns_queries_per_sec = cli.max_dns_queries_per_sec;
        }
        self.verbosity = self.verbosity.max(cli.verbosity);
        self.list_only |= cli.list_only;
        self.whois |= cli.whois;
        if cli.timeout_minutes.is_some() {
            self.timeout_minutes = cli.timeout_minutes;
        }
        self
    }

    /// TTL windows as `Duration`s, ready for [vantage_dispatch::TtlCache].
    pub fn ttl_windows_as_durations(&self) -> HashMap<String, Duration> {
        self.ttl_windows
            .iter()
            .map(|(k, v)| (k.clone(), Duration::from_secs(*v)))
            .collect()
    }
}

/// The subset of CLI flags that can override a loaded/default [Config].
/// Kept separate from [Config] itself so "not passed on the command line"
/// (empty/zero) is distinguishable from "explicitly set to the default".
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub domains: Vec<String>,
    pub domains_file: Option<PathBuf>,
    pub asns: Vec<u32>,
    pub ips: Vec<IpAddr>,
    pub cidrs: Vec<IpNetwork>,
    pub ports: Vec<u16>,
    pub active: bool,
    pub brute_force: bool,
    pub no_recursive: bool,
    pub no_alts: bool,
    pub wordlist: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub max_dns_queries_per_sec: u32,
    pub verbosity: u8,
    pub list_only: bool,
    pub whois: bool,
    pub timeout_minutes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_win_over_file_defaults() {
        let mut file_config = Config::default();
        file_config.domains = vec!["from-file.example".into()];
        file_config.active = false;

        let overrides = CliOverrides {
            domains: vec!["from-cli.example".into()],
            active: true,
            ..Default::default()
        };

        let merged = file_config.merge_cli(overrides);
        assert_eq!(merged.domains, vec!["from-cli.example".to_string()]);
        assert!(merged.active);
    }

    #[test]
    fn empty_cli_overrides_preserve_file_values() {
        let mut file_config = Config::default();
        file_config.domains = vec!["from-file.example".into()];

        let merged = file_config.merge_cli(CliOverrides::default());
        assert_eq!(merged.domains, vec!["from-file.example".to_string()]);
    }
}
