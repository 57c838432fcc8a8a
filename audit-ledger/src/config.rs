//! Configuration for the audit ledger

use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Proof-of-work sealing configuration
    pub sealing: SealingConfig,

    /// Integrity audit configuration
    pub integrity: IntegrityConfig,

    /// Writer actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "audit-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            sealing: SealingConfig::default(),
            integrity: IntegrityConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Proof-of-work sealing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SealingConfig {
    /// Required number of leading zero hex characters in the seal digest
    pub difficulty: usize,

    /// Attempt cap per block. `None` searches until a proof is found.
    pub max_attempts: Option<u64>,
}

impl Default for SealingConfig {
    fn default() -> Self {
        Self {
            difficulty: 4,       // ~1/65536 per attempt
            max_attempts: None,
        }
    }
}

/// What the writer does once an audit has found the chain corrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Keep accepting appends on top of the invalid chain
    #[default]
    Continue,
    /// Refuse every append after a failed audit
    HaltWrites,
}

impl CorruptionPolicy {
    /// Parse from string (`continue` or `halt`)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Some(CorruptionPolicy::Continue),
            "halt" | "halt_writes" => Some(CorruptionPolicy::HaltWrites),
            _ => None,
        }
    }
}

/// Integrity audit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// Behaviour after a failed audit
    #[serde(default)]
    pub on_corruption: CorruptionPolicy,
}

/// Writer actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure on appends)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(difficulty) = std::env::var("AUDIT_LEDGER_DIFFICULTY") {
            config.sealing.difficulty = difficulty.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid AUDIT_LEDGER_DIFFICULTY: {}", e))
            })?;
        }

        if let Ok(attempts) = std::env::var("AUDIT_LEDGER_MAX_SEAL_ATTEMPTS") {
            let attempts = attempts.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid AUDIT_LEDGER_MAX_SEAL_ATTEMPTS: {}", e))
            })?;
            config.sealing.max_attempts = Some(attempts);
        }

        if let Ok(policy) = std::env::var("AUDIT_LEDGER_ON_CORRUPTION") {
            config.integrity.on_corruption = CorruptionPolicy::parse(&policy).ok_or_else(|| {
                crate::Error::Config(format!("Invalid AUDIT_LEDGER_ON_CORRUPTION: {}", policy))
            })?;
        }

        if let Ok(capacity) = std::env::var("AUDIT_LEDGER_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid AUDIT_LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> crate::Result<()> {
        // A SHA-256 hex digest has 64 characters
        if self.sealing.difficulty == 0 || self.sealing.difficulty > 64 {
            return Err(crate::Error::Config(format!(
                "Difficulty must be between 1 and 64, got {}",
                self.sealing.difficulty
            )));
        }

        if self.sealing.max_attempts == Some(0) {
            return Err(crate::Error::Config(
                "max_attempts must be positive when set".to_string(),
            ));
        }

        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "Mailbox capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
