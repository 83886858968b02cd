//! Devnet configuration.
//!
//! Loaded from TOML. Amounts are whole fee-token units and fit in `u64`
//! here. They widen to `Amount` when the devnet is wired up.

use std::collections::HashSet;
use std::path::Path;
use pollbridge_types::MAX_BPS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevnetConfig {
    pub logging: LoggingConfig,
    pub l2: L2Config,
    pub l1: L1Config,
    pub relay: RelayConfig,
    pub scenario: ScenarioConfig,
}

impl DevnetConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: DevnetConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Reject anything the contracts would refuse before wiring them.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.l2.chain_selector == 0 || self.l1.chain_selector == 0 {
            anyhow::bail!("Chain selectors cannot be 0");
        }
        if self.l2.chain_selector == self.l1.chain_selector {
            anyhow::bail!("L1 and L2 need distinct chain selectors");
        }
        if self.l2.gas_limit == 0 || self.l1.ack_gas_limit == 0 {
            anyhow::bail!("Gas limits cannot be 0");
        }
        for (name, bps) in [
            ("l2.platform_fee_bps", self.l2.platform_fee_bps),
            ("l2.relay_margin_bps", self.l2.relay_margin_bps),
            ("scenario.quorum_bps", self.scenario.quorum_bps),
        ] {
            if bps > MAX_BPS {
                anyhow::bail!("{} is {} bps, above {}", name, bps, MAX_BPS);
            }
        }
        self.scenario.validate()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive
    pub level: String,
    /// Log format (json|pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Poll chain and result sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2Config {
    pub chain_selector: u64,
    /// Flat fee paid to the treasury per poll
    pub ops_fee: u64,
    pub platform_fee_bps: u16,
    pub relay_margin_bps: u16,
    /// Gas limit of the result message
    pub gas_limit: u64,
}

impl Default for L2Config {
    fn default() -> Self {
        Self {
            chain_selector: 2,
            ops_fee: 500,
            platform_fee_bps: 500,
            relay_margin_bps: 1_000,
            gas_limit: 200_000,
        }
    }
}

/// Record chain and result registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L1Config {
    pub chain_selector: u64,
    /// Gas limit of the acknowledgement message
    pub ack_gas_limit: u64,
    /// Fee tokens the registry holds to pay for acks
    pub fee_float: u64,
}

impl Default for L1Config {
    fn default() -> Self {
        Self {
            chain_selector: 1,
            ack_gas_limit: 100_000,
            fee_float: 50_000,
        }
    }
}

/// Loopback relay pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub base_fee: u64,
    pub per_byte_fee: u64,
    pub gas_price: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_fee: 1_000,
            per_byte_fee: 10,
            gas_price: 0,
        }
    }
}

/// `member` votes for `option`. Members are numbered from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedVote {
    pub member: u32,
    pub option: u32,
}

/// `from` hands their vote to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedDelegation {
    pub from: u32,
    pub to: u32,
}

/// The poll the devnet runs. Member 0 creates and funds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub group_id: u64,
    pub members: u32,
    pub options: u32,
    pub quorum_enabled: bool,
    pub quorum_bps: u16,
    /// Voting window length in seconds
    pub duration: u64,
    /// Initial escrow funding
    pub funding: u64,
    /// Creator's starting fee-token balance
    pub creator_balance: u64,
    pub delegations: Vec<ScriptedDelegation>,
    pub votes: Vec<ScriptedVote>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            group_id: 1,
            members: 10,
            options: 3,
            quorum_enabled: true,
            quorum_bps: 6_000,
            duration: 3_600,
            funding: 100_000,
            creator_balance: 1_000_000,
            delegations: vec![
                ScriptedDelegation { from: 1, to: 0 },
                ScriptedDelegation { from: 2, to: 0 },
            ],
            votes: vec![
                ScriptedVote { member: 0, option: 0 },
                ScriptedVote { member: 3, option: 0 },
                ScriptedVote { member: 4, option: 1 },
                ScriptedVote { member: 5, option: 0 },
            ],
        }
    }
}

impl ScenarioConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.members == 0 {
            anyhow::bail!("Scenario needs at least one member");
        }
        if self.options == 0 {
            anyhow::bail!("Scenario needs at least one option");
        }
        if self.duration == 0 {
            anyhow::bail!("Voting duration cannot be 0");
        }
        if self.funding > self.creator_balance {
            anyhow::bail!("Funding {} exceeds creator balance {}", self.funding, self.creator_balance);
        }

        let check_member = |index: u32| -> anyhow::Result<()> {
            if index >= self.members {
                anyhow::bail!("Member {} out of range (members = {})", index, self.members);
            }
            Ok(())
        };
        for d in &self.delegations {
            check_member(d.from)?;
            check_member(d.to)?;
        }

        let mut voters = HashSet::new();
        for v in &self.votes {
            check_member(v.member)?;
            if v.option >= self.options {
                anyhow::bail!("Option {} out of range (options = {})", v.option, self.options);
            }
            if !voters.insert(v.member) {
                anyhow::bail!("Member {} votes twice", v.member);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = DevnetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scenario.members, 10);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DevnetConfig::default();
        config.l1.chain_selector = config.l2.chain_selector;
        assert!(config.validate().is_err());

        let mut config = DevnetConfig::default();
        config.l2.platform_fee_bps = 10_001;
        assert!(config.validate().is_err());

        let mut config = DevnetConfig::default();
        config.l1.ack_gas_limit = 0;
        assert!(config.validate().is_err());

        let mut config = DevnetConfig::default();
        config.scenario.votes.push(ScriptedVote { member: 10, option: 0 });
        assert!(config.validate().is_err());

        let mut config = DevnetConfig::default();
        config.scenario.votes.push(ScriptedVote { member: 0, option: 1 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = DevnetConfig::default();
        config.scenario.quorum_bps = 2_500;
        config.to_file(file.path()).unwrap();

        let loaded = DevnetConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&DevnetConfig::default()).unwrap();
        assert!(toml_str.contains("[scenario]"));
        assert!(toml_str.contains("[[scenario.votes]]"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DevnetConfig::from_file(&dir.path().join("absent.toml")).is_err());
    }
}
