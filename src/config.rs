use std::fs::read_to_string;
use std::net::IpAddr;
use std::path::Path;

use ipnetwork::IpNetwork;
use serde::Deserialize;
use serde_default_utils::*;
use thiserror::Error;

use crate::ip_iter::usable_hosts;
use crate::range::{AddressRange, RangeError};

pub const DEFAULT_LOCATION: &str = "rangeperm.toml";

/// One range to shuffle, given either by bounds or by CIDR.
#[derive(Deserialize, Clone, Debug)]
pub struct RangeConfig {
    pub start: Option<IpAddr>,
    pub end: Option<IpAddr>,
    pub cidr: Option<String>,

    /// Leave out network and broadcast addresses of an IPv4 CIDR.
    #[serde(default)]
    pub hosts_only: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// Addresses printed per range at most.
    #[serde(default = "default_u64::<256>")]
    pub limit: u64,
    pub ranges: Vec<RangeConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode config: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("range #{index}: {source}")]
    Range {
        index: usize,
        #[source]
        source: RangeError,
    },
    #[error("range #{index}: expected either start and end, or cidr")]
    Incomplete { index: usize },
}

impl RangeConfig {
    fn to_range(&self, index: usize) -> Result<AddressRange, ConfigError> {
        let range = match (self.start, self.end, &self.cidr) {
            (Some(start), Some(end), None) => AddressRange::new(start, end),
            (None, None, Some(cidr)) => cidr.parse::<IpNetwork>().map_err(RangeError::from).map(|net| {
                if self.hosts_only {
                    usable_hosts(net)
                } else {
                    AddressRange::from_network(net)
                }
            }),
            _ => return Err(ConfigError::Incomplete { index }),
        };
        range.map_err(|source| ConfigError::Range { index, source })
    }
}

impl Config {
    pub fn address_ranges(&self) -> Result<Vec<AddressRange>, ConfigError> {
        self.ranges
            .iter()
            .enumerate()
            .map(|(index, range)| range.to_range(index))
            .collect()
    }
}

pub fn parse(text: &str) -> Result<Config, ConfigError> {
    let deserialized: Config = toml::from_str(text)?;
    Ok(deserialized)
}

pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let text = read_to_string(path)?;
    parse(&text)
}

pub fn read_from_default_location() -> Result<Config, ConfigError> {
    read_from_path(DEFAULT_LOCATION)
}
