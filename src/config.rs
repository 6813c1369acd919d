use crate::uf::StateCode;
use anyhow::{ensure, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// API base baked in at build time, overridable at run time
pub const DEFAULT_API_BASE: &str = match option_env!("BRASIL_IO_API") {
    Some(url) => url,
    None => "https://api.brasil.io/v1/dataset/covid19",
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// State shown at startup
    #[arg(short, long, env = "COVID_MAP_STATE", default_value = "GO")]
    pub state: StateCode,

    /// Base URL of the covid19 dataset API
    #[arg(long, env = "BRASIL_IO_API", default_value = DEFAULT_API_BASE)]
    pub api_url: String,

    /// API token sent as `Authorization: Token ...`
    #[arg(long, env = "BRASIL_IO_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Directory holding `{uf}/map.json` boundary files
    #[arg(long, env = "COVID_MAP_ASSETS", value_name = "DIR", default_value = "assets")]
    pub assets: PathBuf,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 20)]
    pub timeout: u64,

    /// Log file (the terminal is taken by the map)
    #[arg(long, value_name = "FILE", default_value = "covid-map.log")]
    pub log_file: PathBuf,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub initial_state: StateCode,
    pub api_base: String,
    pub api_token: Option<String>,
    pub assets: PathBuf,
    pub timeout: Duration,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let api_base = cli.api_url.trim().trim_end_matches('/').to_string();
        ensure!(
            api_base.starts_with("http://") || api_base.starts_with("https://"),
            "API URL must be http(s): {:?}",
            cli.api_url
        );
        ensure!(cli.timeout > 0, "timeout must be at least one second");

        Ok(Self {
            initial_state: cli.state,
            api_base,
            api_token: cli.api_token.filter(|t| !t.trim().is_empty()),
            assets: cli.assets,
            timeout: Duration::from_secs(cli.timeout),
            log_file: cli.log_file,
        })
    }
}
