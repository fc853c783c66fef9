use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Channel name length cap, shared with tag bytes.
pub const MAX_NAME_BYTES: usize = 48;
/// Description length cap.
pub const MAX_DESCRIPTION_BYTES: usize = 1_024;
/// Tag count cap per channel.
pub const MAX_TAGS: usize = 20;

fn default_ttl_days() -> i64 {
    120
}

fn default_content_size_kb() -> i64 {
    10
}

fn default_peak_rate() -> i64 {
    10
}

/// Channel definition document exchanged with the channel service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "default_content_size_kb")]
    pub content_size_kb: i64,
    #[serde(default = "default_peak_rate")]
    pub peak_request_rate_seconds: i64,
}

impl ChannelConfig {
    /// Creates a config with service defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl_days: default_ttl_days(),
            description: String::new(),
            tags: BTreeSet::new(),
            content_size_kb: default_content_size_kb(),
            peak_request_rate_seconds: default_peak_rate(),
        }
    }

    pub fn with_ttl_days(mut self, ttl_days: i64) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_content_size_kb(mut self, content_size_kb: i64) -> Self {
        self.content_size_kb = content_size_kb;
        self
    }

    pub fn with_peak_request_rate_seconds(mut self, rate: i64) -> Self {
        self.peak_request_rate_seconds = rate;
        self
    }

    /// Serializes the config to its JSON document form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores a config from its JSON document form.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Contract consumed from the channel service.
pub trait ChannelDirectory {
    fn channel_exists(&self, name: &str) -> bool;
    fn channels(&self) -> Vec<ChannelConfig>;
}

/// Rejection raised by channel validation. `NameInUse` is the conflict
/// outcome; every other variant is a malformed request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel name wasn't given")]
    NameMissing,
    #[error("channel name {name} is too long")]
    NameTooLong { name: String },
    #[error("channel name {name} must only contain characters a-z, A-Z, 0-9, and underscore")]
    InvalidNameCharacters { name: String },
    #[error("channel name {name} already exists")]
    NameInUse { name: String },
    #[error("peak request rate must be greater than zero")]
    NonPositiveRate,
    #[error("content size must be greater than zero")]
    NonPositiveContentSize,
    #[error("ttl must be greater than zero")]
    NonPositiveTtl,
    #[error("description must be less than 1024 bytes")]
    DescriptionTooLong,
    #[error("channels are limited to 20 tags")]
    TooManyTags,
    #[error("tag {tag} must only contain characters a-z, A-Z, 0-9, colon, and dash")]
    InvalidTagCharacters { tag: String },
    #[error("tag {tag} must be less than 48 bytes")]
    TagTooLong { tag: String },
}

/// Validates channel definitions before they reach the channel service.
pub struct ChannelValidator<D> {
    directory: D,
}

impl<D: ChannelDirectory> ChannelValidator<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Checks `config` for structural problems, and on creation for a name
    /// collision with an existing channel.
    pub fn validate(&self, config: &ChannelConfig, is_creation: bool) -> Result<(), ChannelError> {
        let name = config.name.trim();
        if name.is_empty() {
            return Err(ChannelError::NameMissing);
        }
        if name.len() > MAX_NAME_BYTES {
            return Err(ChannelError::NameTooLong {
                name: name.to_string(),
            });
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ChannelError::InvalidNameCharacters {
                name: name.to_string(),
            });
        }
        if is_creation && self.directory.channel_exists(name) {
            return Err(ChannelError::NameInUse {
                name: name.to_string(),
            });
        }
        if config.peak_request_rate_seconds <= 0 {
            return Err(ChannelError::NonPositiveRate);
        }
        if config.content_size_kb <= 0 {
            return Err(ChannelError::NonPositiveContentSize);
        }
        if config.ttl_days <= 0 {
            return Err(ChannelError::NonPositiveTtl);
        }
        if config.description.len() > MAX_DESCRIPTION_BYTES {
            return Err(ChannelError::DescriptionTooLong);
        }
        if config.tags.len() > MAX_TAGS {
            return Err(ChannelError::TooManyTags);
        }
        for tag in &config.tags {
            if !tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ':' || c == '-')
            {
                return Err(ChannelError::InvalidTagCharacters { tag: tag.clone() });
            }
            if tag.len() > MAX_NAME_BYTES {
                return Err(ChannelError::TagTooLong { tag: tag.clone() });
            }
        }
        Ok(())
    }
}
