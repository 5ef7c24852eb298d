//! Per-switch configuration file
//!
//! ```text
//! 14            <- bridge priority
//! r-0 1         <- access port on VLAN 1
//! r-1 2
//! rr-0-1 T      <- trunk port
//! rr-0-2 T
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::{Error, PortMode, Result, VlanId, MAX_VLAN_ID};

/// Number of port lines a configuration file must contain
pub const SWITCH_NUM_INTERFACES: usize = 4;

/// One configured port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    /// Interface name as written in the file
    pub name: String,
    /// Access VLAN or trunk
    pub mode: PortMode,
}

/// Parsed switch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchConfig {
    /// Bridge priority, also the bridge identity in BPDUs
    pub priority: u16,
    /// Ports in link-driver order
    pub ports: Vec<PortConfig>,
}

impl SwitchConfig {
    /// Conventional location of a switch's configuration: `<dir>/switch<id>.cfg`
    pub fn path_for<P: AsRef<Path>>(dir: P, switch_id: u32) -> PathBuf {
        dir.as_ref().join(format!("switch{}.cfg", switch_id))
    }

    /// Read and parse a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::config(0, format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: SwitchConfig = text.parse()?;
        debug!(path = %path.display(), priority = config.priority, "Loaded switch configuration");
        Ok(config)
    }

    /// Port modes in port-index order
    pub fn modes(&self) -> Vec<PortMode> {
        self.ports.iter().map(|p| p.mode).collect()
    }
}

fn parse_mode(token: &str, line: usize) -> Result<PortMode> {
    if token == "T" {
        return Ok(PortMode::Trunk);
    }

    let vlan: VlanId = token
        .parse()
        .map_err(|_| Error::config(line, format!("invalid port mode '{}'", token)))?;
    if vlan > MAX_VLAN_ID {
        return Err(Error::config(
            line,
            format!("VLAN id {} exceeds {}", vlan, MAX_VLAN_ID),
        ));
    }
    Ok(PortMode::Access(vlan))
}

impl FromStr for SwitchConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut lines = s.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

        let (_, first) = lines
            .next()
            .ok_or_else(|| Error::config(1, "missing bridge priority"))?;
        let priority: u16 = first
            .parse()
            .map_err(|_| Error::config(1, format!("invalid bridge priority '{}'", first)))?;

        let mut ports = Vec::with_capacity(SWITCH_NUM_INTERFACES);
        for _ in 0..SWITCH_NUM_INTERFACES {
            let (line, text) = lines.next().ok_or_else(|| {
                Error::config(
                    ports.len() + 2,
                    format!("expected {} port lines", SWITCH_NUM_INTERFACES),
                )
            })?;

            let mut fields = text.split_whitespace();
            let (name, mode) = match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(mode), None) => (name, mode),
                _ => {
                    return Err(Error::config(
                        line,
                        format!("expected '<interface> <mode>', got '{}'", text),
                    ))
                }
            };

            ports.push(PortConfig {
                name: name.to_string(),
                mode: parse_mode(mode, line)?,
            });
        }

        if let Some((line, extra)) = lines.find(|(_, l)| !l.is_empty()) {
            return Err(Error::config(line, format!("unexpected trailing line '{}'", extra)));
        }

        Ok(Self { priority, ports })
    }
}

impl fmt::Display for SwitchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.priority)?;
        for port in &self.ports {
            match port.mode {
                PortMode::Trunk => writeln!(f, "{} T", port.name)?,
                PortMode::Access(vlan) => writeln!(f, "{} {}", port.name, vlan)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "14\nr-0 1\nr-1 2\nrr-0-1 T\nrr-0-2 T\n";

    #[test]
    fn test_parse_sample() {
        let config: SwitchConfig = SAMPLE.parse().unwrap();
        assert_eq!(config.priority, 14);
        assert_eq!(
            config.modes(),
            vec![
                PortMode::Access(1),
                PortMode::Access(2),
                PortMode::Trunk,
                PortMode::Trunk
            ]
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let config: SwitchConfig = SAMPLE.parse().unwrap();
        assert_eq!(config.to_string(), SAMPLE);
    }

    #[test]
    fn test_missing_port_line() {
        let err = "14\nr-0 1\nr-1 2\n".parse::<SwitchConfig>().unwrap_err();
        match err {
            Error::Config { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_priority() {
        assert!(matches!(
            "root\nr-0 1\nr-1 2\nr-2 T\nr-3 T".parse::<SwitchConfig>(),
            Err(Error::Config { line: 1, .. })
        ));
        assert!("".parse::<SwitchConfig>().is_err());
    }

    #[test]
    fn test_bad_mode() {
        assert!(matches!(
            "10\nr-0 X\nr-1 2\nr-2 T\nr-3 T".parse::<SwitchConfig>(),
            Err(Error::Config { line: 2, .. })
        ));
        assert!(matches!(
            "10\nr-0 1\nr-1 5000\nr-2 T\nr-3 T".parse::<SwitchConfig>(),
            Err(Error::Config { line: 3, .. })
        ));
        assert!(matches!(
            "10\nr-0 1\nr-1 2\nr-2\nr-3 T".parse::<SwitchConfig>(),
            Err(Error::Config { line: 4, .. })
        ));
    }

    #[test]
    fn test_trailing_lines() {
        assert!(format!("{}\n\n", SAMPLE).parse::<SwitchConfig>().is_ok());
        assert!(format!("{}r-4 T\n", SAMPLE).parse::<SwitchConfig>().is_err());
    }

    #[test]
    fn test_path_for() {
        let path = SwitchConfig::path_for("configs", 2);
        assert_eq!(path, PathBuf::from("configs/switch2.cfg"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SwitchConfig::load("/nonexistent/switch0.cfg").unwrap_err();
        assert!(matches!(err, Error::Config { line: 0, .. }));
    }
}
