use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// A named scope claiming exclusive replication rights over a set of
/// channels. A domain is valid only when `exclude_except` is populated;
/// across all currently-valid domains the claimed sets are pairwise
/// disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationDomain {
    pub domain: String,
    #[serde(default)]
    pub historical_days: u64,
    #[serde(default)]
    pub exclude_except: BTreeSet<String>,
}

impl ReplicationDomain {
    /// Creates a domain claiming no channels yet.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            historical_days: 0,
            exclude_except: BTreeSet::new(),
        }
    }

    /// Adds a channel to the domain's claim.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.exclude_except.insert(channel.into());
        self
    }

    /// How far back replication reaches on first sync.
    pub fn with_historical_days(mut self, historical_days: u64) -> Self {
        self.historical_days = historical_days;
        self
    }

    /// A domain is valid only if it claims at least one channel.
    pub fn is_valid(&self) -> bool {
        !self.exclude_except.is_empty()
    }

    /// Serializes the domain to its JSON document form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores a domain from its JSON document form.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Contract consumed from the replication data-access layer.
pub trait DomainSource {
    fn domains(&self, include_invalid: bool) -> Vec<ReplicationDomain>;
}

/// Rejection raised by replication exclusivity checks. `EmptyExcludeExcept`
/// is a malformed request; the other variants are conflicts with an existing
/// claim. All checks are synchronous and never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    #[error("{channel} cannot have data inserted while it is replicating")]
    ChannelReplicating { channel: String },
    #[error("{domain} has channels already being replicated: {overlap:?}")]
    DomainOverlap {
        domain: String,
        overlap: Vec<String>,
    },
    #[error("excludeExcept must be populated")]
    EmptyExcludeExcept,
}

/// Enforces exclusivity between replication domains, and between replication
/// and local ingestion.
pub struct ReplicationValidator<D> {
    source: D,
}

impl<D: DomainSource> ReplicationValidator<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    /// Rejects a local write to `channel_name` while any valid domain claims
    /// the channel: replication is exclusive of local ingestion for a
    /// mirrored channel.
    pub fn check_if_replicating(&self, channel_name: &str) -> Result<(), ReplicationError> {
        for domain in self.source.domains(false) {
            if domain.exclude_except.contains(channel_name) {
                return Err(ReplicationError::ChannelReplicating {
                    channel: channel_name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Rejects `candidate` if its definition is malformed or its claim
    /// intersects any other registered domain's claim (invalid domains
    /// included). A domain is never compared against itself.
    pub fn validate_domain(&self, candidate: &ReplicationDomain) -> Result<(), ReplicationError> {
        if !candidate.is_valid() {
            return Err(ReplicationError::EmptyExcludeExcept);
        }
        for other in self.source.domains(true) {
            if other.domain == candidate.domain {
                continue;
            }
            let overlap: Vec<String> = other
                .exclude_except
                .intersection(&candidate.exclude_except)
                .cloned()
                .collect();
            if !overlap.is_empty() {
                return Err(ReplicationError::DomainOverlap {
                    domain: candidate.domain.clone(),
                    overlap,
                });
            }
        }
        Ok(())
    }
}
