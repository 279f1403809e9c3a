use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use ipnetwork::IpNetwork;
use vantage_session::CliOverrides;

/// External attack-surface discovery. Seeds a session from the given scope
/// and lets the DNS handler and its siblings expand it until the queue
/// drains or `-timeout` elapses.
#[derive(Parser, Debug)]
#[clap(name = "vantage")]
pub struct Cli {
    /// Root domain to enumerate, repeatable.
    #[clap(short = 'd', long = "domain")]
    pub domains: Vec<String>,

    /// File containing one root domain per line.
    #[clap(long = "df")]
    pub domains_file: Option<PathBuf>,

    /// ASN to treat as in-scope, repeatable.
    #[clap(long = "asn")]
    pub asns: Vec<u32>,

    /// Individual IP address to treat as in-scope, repeatable.
    #[clap(long = "ip")]
    pub ips: Vec<IpAddr>,

    /// CIDR block to treat as in-scope, repeatable.
    #[clap(long = "cidr")]
    pub cidrs: Vec<IpNetwork>,

    /// Port to consider during service discovery, repeatable.
    #[clap(short = 'p', long = "port")]
    pub ports: Vec<u16>,

    /// Perform active techniques (zone transfers, wider reverse sweeps).
    #[clap(long = "active")]
    pub active: bool,

    /// Attempt brute-force subdomain guessing from the configured wordlist.
    #[clap(long = "brute")]
    pub brute_force: bool,

    /// Disable recursive subdomain stem follow-up.
    #[clap(long = "norecursive")]
    pub no_recursive: bool,

    /// Disable alteration-based name generation.
    #[clap(long = "noalts")]
    pub no_alts: bool,

    /// Wordlist path for brute-force subdomain guessing.
    #[clap(short = 'w', long = "wordlist")]
    pub wordlist: Option<PathBuf>,

    /// Output file path (JSON-Lines, `amass.json` schema).
    #[clap(short = 'o', long = "out")]
    pub output_file: Option<PathBuf>,

    /// Maximum DNS queries issued per second.
    #[clap(long = "freq")]
    pub max_dns_queries_per_sec: Option<u32>,

    /// Increase log verbosity (repeatable: `-v`, `-vv`).
    #[clap(short = 'v', action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// List discovered names without writing graph state to disk.
    #[clap(short = 'l', long = "list")]
    pub list_only: bool,

    /// Enable WHOIS/RDAP enrichment of discovered organizations.
    #[clap(long = "whois")]
    pub whois: bool,

    /// Load a TOML configuration file, merged under CLI precedence.
    #[clap(long = "config")]
    pub config: Option<PathBuf>,

    /// Bound total session runtime, in minutes.
    #[clap(long = "timeout")]
    pub timeout_minutes: Option<u64>,
}

impl Cli {
    pub fn into_overrides(self) -> (Option<PathBuf>, CliOverrides) {
        let overrides = CliOverrides {
            domains: self.domains,
            domains_file: self.domains_file,
            asns: self.asns,
            ips: self.ips,
            cidrs: self.cidrs,
            ports: self.ports,
            active: self.active,
            brute_force: self.brute_force,
            no_recursive: self.no_recursive,
            no_alts: self.no_alts,
            wordlist: self.wordlist,
            output_file: self.output_file,
            max_dns_queries_per_sec: self.max_dns_queries_per_sec.unwrap_or(0),
            verbosity: self.verbosity,
            list_only: self.list_only,
            whois: self.whois,
            timeout_minutes: self.timeout_minutes,
        };
        (self.config, overrides)
    }
}
