// src/spec/producer.rs

//! Feature-pack identity: producer, channel, and build.
//!
//! A feature-pack id uses the format `producer@channel#build`:
//!
//! - `core@1.0#1.0.3` - build 1.0.3 on the 1.0 channel of producer "core"
//! - `web@main#2024.11` - a date-versioned build on the main channel
//!
//! The `(producer, channel)` pair is the version-conflict key: a resolved
//! layout may select at most one build per channel. Builds are opaque
//! strings compared for identity only; no ordering is defined over them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identity of one feature-pack build: `producer@channel#build`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeaturePackId {
    /// Producer name
    pub producer: String,
    /// Release channel within the producer
    pub channel: String,
    /// Opaque build identifier
    pub build: String,
}

impl FeaturePackId {
    /// Create a new feature-pack id
    pub fn new(
        producer: impl Into<String>,
        channel: impl Into<String>,
        build: impl Into<String>,
    ) -> Self {
        Self {
            producer: producer.into(),
            channel: channel.into(),
            build: build.into(),
        }
    }

    /// Parse an id from string format `producer@channel#build`
    pub fn parse(s: &str) -> Result<Self, PackIdParseError> {
        let at_pos = s
            .find('@')
            .ok_or_else(|| PackIdParseError::MissingAt(s.to_string()))?;

        let hash_pos = s[at_pos..]
            .find('#')
            .map(|p| at_pos + p)
            .ok_or_else(|| PackIdParseError::MissingHash(s.to_string()))?;

        let producer = &s[..at_pos];
        let channel = &s[at_pos + 1..hash_pos];
        let build = &s[hash_pos + 1..];

        if producer.is_empty() {
            return Err(PackIdParseError::EmptyProducer(s.to_string()));
        }
        if channel.is_empty() {
            return Err(PackIdParseError::EmptyChannel(s.to_string()));
        }
        if build.is_empty() {
            return Err(PackIdParseError::EmptyBuild(s.to_string()));
        }

        let valid_chars = |c: char| c.is_alphanumeric() || c == '.' || c == '-' || c == '_';

        if !producer.chars().all(valid_chars) {
            return Err(PackIdParseError::InvalidProducer(producer.to_string()));
        }
        if !channel.chars().all(valid_chars) {
            return Err(PackIdParseError::InvalidChannel(channel.to_string()));
        }
        if !build.chars().all(valid_chars) {
            return Err(PackIdParseError::InvalidBuild(build.to_string()));
        }

        Ok(Self {
            producer: producer.to_string(),
            channel: channel.to_string(),
            build: build.to_string(),
        })
    }

    /// The `(producer, channel)` pair this build belongs to
    pub fn origin(&self) -> ProducerChannel {
        ProducerChannel {
            producer: self.producer.clone(),
            channel: self.channel.clone(),
        }
    }

    /// Check if this id is another build of the same producer channel
    pub fn same_channel(&self, other: &FeaturePackId) -> bool {
        self.producer == other.producer && self.channel == other.channel
    }
}

impl fmt::Display for FeaturePackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.producer, self.channel, self.build)
    }
}

impl FromStr for FeaturePackId {
    type Err = PackIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeaturePackId::parse(s)
    }
}

/// The version-conflict key: a producer plus one of its release channels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProducerChannel {
    pub producer: String,
    pub channel: String,
}

impl ProducerChannel {
    pub fn new(producer: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            channel: channel.into(),
        }
    }

    /// Pin this channel to a concrete build
    pub fn build(&self, build: impl Into<String>) -> FeaturePackId {
        FeaturePackId {
            producer: self.producer.clone(),
            channel: self.channel.clone(),
            build: build.into(),
        }
    }
}

impl fmt::Display for ProducerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.producer, self.channel)
    }
}

/// Errors that can occur when parsing a feature-pack id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackIdParseError {
    #[error("Missing '@' in feature-pack id: {0}")]
    MissingAt(String),
    #[error("Missing '#' in feature-pack id: {0}")]
    MissingHash(String),
    #[error("Empty producer in feature-pack id: {0}")]
    EmptyProducer(String),
    #[error("Empty channel in feature-pack id: {0}")]
    EmptyChannel(String),
    #[error("Empty build in feature-pack id: {0}")]
    EmptyBuild(String),
    #[error("Invalid producer name: {0}")]
    InvalidProducer(String),
    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),
    #[error("Invalid build: {0}")]
    InvalidBuild(String),
}
