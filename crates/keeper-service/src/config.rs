use keeper_types::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Environment variable {var} has invalid value {value:?}")]
    Env { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Keeper configuration, built once at startup and handed to each component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeeperConfig {
    /// Base58 id of the jackpot program
    pub program_id: String,

    /// JSON-RPC endpoint used to read the pot account
    pub rpc_url: String,

    /// Commitment level for reads
    pub commitment: String,

    /// Signing relay that submits transition instructions
    pub relay_url: String,

    /// Bearer credential for the relay
    #[serde(skip_serializing)]
    pub relay_token: Option<String>,

    pub active_duration_secs: u64,
    pub cooldown_duration_secs: u64,
    pub poll_interval_secs: u64,

    /// Upper bound on each network call
    pub rpc_timeout_secs: u64,

    /// Consecutive failed cycles before a warning is raised; 0 disables
    pub failure_alert_threshold: u32,

    pub buyback_address: Option<String>,
    pub fee_address: Option<String>,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            program_id: "HtbKartrbcGdW3wfhV2WsZVE4ybHhkKqWUr7V6PwEgfZ".to_string(),
            rpc_url: "https://api.devnet.solana.com".to_string(),
            commitment: "confirmed".to_string(),
            relay_url: "http://127.0.0.1:8080".to_string(),
            relay_token: None,
            active_duration_secs: 120,
            cooldown_duration_secs: 360,
            poll_interval_secs: 5,
            rpc_timeout_secs: 10,
            failure_alert_threshold: 5,
            buyback_address: None,
            fee_address: None,
        }
    }
}

const COMMITMENTS: [&str; 3] = ["processed", "confirmed", "finalized"];

impl KeeperConfig {
    /// Defaults, overlaid by `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `KEEPER_*`, `BUYBACK_ADDRESS` and `FEE_ADDRESS` from the process
    /// environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|var| std::env::var(var).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KEEPER_PROGRAM_ID") {
            self.program_id = v;
        }
        if let Some(v) = lookup("KEEPER_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = lookup("KEEPER_COMMITMENT") {
            self.commitment = v;
        }
        if let Some(v) = lookup("KEEPER_RELAY_URL") {
            self.relay_url = v;
        }
        if let Some(v) = lookup("KEEPER_RELAY_TOKEN") {
            self.relay_token = Some(v);
        }
        if let Some(v) = lookup("BUYBACK_ADDRESS") {
            self.buyback_address = Some(v);
        }
        if let Some(v) = lookup("FEE_ADDRESS") {
            self.fee_address = Some(v);
        }

        parse_env(&lookup, "KEEPER_ACTIVE_DURATION_SECS", &mut self.active_duration_secs)?;
        parse_env(&lookup, "KEEPER_COOLDOWN_DURATION_SECS", &mut self.cooldown_duration_secs)?;
        parse_env(&lookup, "KEEPER_POLL_INTERVAL_SECS", &mut self.poll_interval_secs)?;
        parse_env(&lookup, "KEEPER_RPC_TIMEOUT_SECS", &mut self.rpc_timeout_secs)?;
        parse_env(&lookup, "KEEPER_FAILURE_ALERT_THRESHOLD", &mut self.failure_alert_threshold)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.program_id()?;
        self.buyback()?;
        self.fee()?;

        for (name, value) in [
            ("active_duration_secs", self.active_duration_secs),
            ("cooldown_duration_secs", self.cooldown_duration_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("rpc_timeout_secs", self.rpc_timeout_secs),
        ] {
            if value == 0 || value > i64::MAX as u64 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }

        for (name, url) in [("rpc_url", &self.rpc_url), ("relay_url", &self.relay_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!("{name} must be an http(s) URL, got {url}")));
            }
        }

        if !COMMITMENTS.contains(&self.commitment.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "commitment must be one of {COMMITMENTS:?}, got {}",
                self.commitment
            )));
        }

        Ok(())
    }

    /// Reward distribution needs both recipients; without them every round
    /// with deposits would stall in cooldown
    pub fn require_payout_addresses(&self) -> Result<(Address, Address)> {
        match (self.buyback()?, self.fee()?) {
            (Some(buyback), Some(fee)) => Ok((buyback, fee)),
            (None, _) => Err(ConfigError::Invalid(
                "buyback_address is required (set BUYBACK_ADDRESS)".to_string(),
            )),
            (_, None) => Err(ConfigError::Invalid(
                "fee_address is required (set FEE_ADDRESS)".to_string(),
            )),
        }
    }

    pub fn program_id(&self) -> Result<Address> {
        parse_address("program_id", &self.program_id)
    }

    pub fn buyback(&self) -> Result<Option<Address>> {
        self.buyback_address
            .as_deref()
            .map(|s| parse_address("buyback_address", s))
            .transpose()
    }

    pub fn fee(&self) -> Result<Option<Address>> {
        self.fee_address
            .as_deref()
            .map(|s| parse_address("fee_address", s))
            .transpose()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    value
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{field}: {e}")))
}

fn parse_env<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(value) = lookup(var) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const ADDR: &str = "11111111111111111111111111111111";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = KeeperConfig::default();
        config.validate().unwrap();
        assert_eq!(config.active_duration_secs, 120);
        assert_eq!(config.cooldown_duration_secs, 360);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"poll_interval_secs": 2, "fee_address": "{ADDR}"}}"#).unwrap();

        let config = KeeperConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.cooldown_duration_secs, 360);
        assert_eq!(config.fee().unwrap(), Some(Address::new([0u8; 32])));
    }

    #[test]
    fn test_load_rejects_misspelled_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fee_adress": "{ADDR}"}}"#).unwrap();

        match KeeperConfig::load(Some(file.path())) {
            Err(ConfigError::Parse(e)) => assert!(e.to_string().contains("fee_adress")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_payout_addresses_required() {
        let mut config = KeeperConfig::default();
        assert!(matches!(
            config.require_payout_addresses(),
            Err(ConfigError::Invalid(msg)) if msg.contains("buyback_address")
        ));

        config.buyback_address = Some(ADDR.to_string());
        assert!(matches!(
            config.require_payout_addresses(),
            Err(ConfigError::Invalid(msg)) if msg.contains("fee_address")
        ));

        config.fee_address = Some(ADDR.to_string());
        let zero = Address::new([0u8; 32]);
        assert_eq!(config.require_payout_addresses().unwrap(), (zero, zero));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KeeperConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            KeeperConfig::load(Some(file.path())),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = KeeperConfig::default();
        config
            .apply_env_with(env(&[
                ("KEEPER_RPC_URL", "http://localhost:8899"),
                ("KEEPER_POLL_INTERVAL_SECS", " 1 "),
                ("BUYBACK_ADDRESS", ADDR),
                ("KEEPER_RELAY_TOKEN", "secret"),
            ]))
            .unwrap();

        assert_eq!(config.rpc_url, "http://localhost:8899");
        assert_eq!(config.poll_interval_secs, 1);
        assert_eq!(config.buyback_address.as_deref(), Some(ADDR));
        assert_eq!(config.relay_token.as_deref(), Some("secret"));
        config.validate().unwrap();
    }

    #[test]
    fn test_env_rejects_non_numeric_duration() {
        let mut config = KeeperConfig::default();
        let err = config
            .apply_env_with(env(&[("KEEPER_ACTIVE_DURATION_SECS", "two minutes")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "KEEPER_ACTIVE_DURATION_SECS", .. }));
    }

    #[test]
    fn test_validation_failures() {
        let cases: Vec<fn(&mut KeeperConfig)> = vec![
            |c| c.program_id = "not-base58-0OIl".to_string(),
            |c| c.cooldown_duration_secs = 0,
            |c| c.poll_interval_secs = 0,
            |c| c.rpc_url = "ftp://example.com".to_string(),
            |c| c.commitment = "eventually".to_string(),
            |c| c.fee_address = Some("short".to_string()),
        ];

        for mutate in cases {
            let mut config = KeeperConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{config:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_token_is_not_serialized() {
        let config = KeeperConfig {
            relay_token: Some("secret".to_string()),
            ..KeeperConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
