//! CLI argument parsing

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use l2switch_engine::EngineConfig;

#[derive(Parser, Debug)]
#[command(name = "l2switch")]
#[command(version, about = "VLAN-aware learning switch with spanning tree", long_about = None)]
pub struct Cli {
    /// Switch number, selects <CONFIG_DIR>/switch<ID>.cfg
    #[arg(value_name = "SWITCH_ID")]
    pub switch_id: u32,

    /// Interfaces to switch between, in port order (defaults to the names in the config file)
    #[arg(value_name = "INTERFACE")]
    pub interfaces: Vec<String>,

    /// Directory holding the switch configuration files
    #[arg(short = 'c', long, value_name = "DIR", default_value = "configs")]
    pub config_dir: PathBuf,

    /// Interval between spanning tree hellos
    #[arg(
        long,
        value_name = "MS",
        default_value = "1000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub hello_ms: u64,

    /// Forget learned stations after this many seconds of silence
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub mac_aging: Option<u64>,

    /// Reclaim root after this many hellos without hearing it
    #[arg(long, value_name = "HELLOS")]
    pub max_age: Option<u32>,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Path of the configuration file for this switch
    pub fn config_path(&self) -> PathBuf {
        l2switch_core::SwitchConfig::path_for(&self.config_dir, self.switch_id)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config =
            EngineConfig::default().with_hello_interval(Duration::from_millis(self.hello_ms));
        if let Some(secs) = self.mac_aging {
            config = config.with_mac_aging(Duration::from_secs(secs));
        }
        if let Some(hellos) = self.max_age {
            config = config.with_max_age(hellos);
        }
        config
    }

    /// Default log filter for the verbosity count
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
