//! Startup configuration errors.
//!
//! Everything that can go wrong before training begins: CLI flags, training
//! parameters, and attacker-rule ingestion. All of these are fatal at
//! startup; the driver reports the violated rule on stderr and exits
//! non-zero.

/// Configuration error. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required CLI flag is missing.
    #[error("missing required argument {0}")]
    MissingArgument(&'static str),

    /// A CLI flag has an out-of-range or unparseable value.
    #[error("invalid argument {flag}: {reason}")]
    InvalidArgument { flag: String, reason: String },

    /// A training parameter failed validation.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: String },

    /// The attacker rule file is not valid JSON.
    #[error("cannot parse attacker rule file: {0}")]
    RuleFile(#[from] serde_json::Error),

    /// A rule names a feature the dataset does not have.
    #[error("rule {rule}: feature {feature} out of range (dataset has {n_features} features)")]
    RuleFeature {
        rule: usize,
        feature: usize,
        n_features: usize,
    },

    /// A rule's pre-condition or perturbation does not fit the column kind.
    #[error("rule {rule} on feature {feature}: {reason}")]
    RuleKind {
        rule: usize,
        feature: usize,
        reason: String,
    },

    /// A rule cost is not strictly positive and finite.
    #[error("rule {rule}: cost {cost} must be positive and finite")]
    RuleCost { rule: usize, cost: f64 },

    /// A rule references a categorical symbol the column never takes.
    #[error("rule {rule}: unknown symbol '{symbol}'")]
    RuleSymbol { rule: usize, symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
