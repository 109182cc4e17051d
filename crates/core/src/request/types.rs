//! Types for demand requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A creative size in density-independent pixels.
///
/// Serialized as `"WIDTHxHEIGHT"` (e.g. `"300x250"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdSize {
    pub width: u32,
    pub height: u32,
}

impl AdSize {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Error returned when a string is not a valid `WIDTHxHEIGHT` size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ad size '{0}': expected WIDTHxHEIGHT")]
pub struct ParseAdSizeError(pub String);

impl FromStr for AdSize {
    type Err = ParseAdSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseAdSizeError(s.to_string());
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        let height = height.trim().parse().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for AdSize {
    type Error = ParseAdSizeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AdSize> for String {
    fn from(size: AdSize) -> Self {
        size.to_string()
    }
}

/// Configuration of a single demand request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Stored request id on the demand server (e.g. "1001-1").
    pub config_id: String,
    /// Primary creative size.
    pub size: AdSize,
    /// Extra sizes the request also accepts, in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_sizes: Vec<AdSize>,
}

impl RequestPayload {
    /// Create a payload with a single primary size.
    pub fn new(config_id: impl Into<String>, size: AdSize) -> Self {
        Self {
            config_id: config_id.into(),
            size,
            additional_sizes: Vec::new(),
        }
    }

    /// Append an additional accepted size.
    ///
    /// Returns false (and leaves the payload untouched) if the size is
    /// already accepted.
    pub fn add_additional_size(&mut self, size: AdSize) -> bool {
        if self.accepts(size) {
            return false;
        }
        self.additional_sizes.push(size);
        true
    }

    /// Whether the payload accepts `size`, either as primary or additional.
    pub fn accepts(&self, size: AdSize) -> bool {
        self.size == size || self.additional_sizes.contains(&size)
    }

    /// All accepted sizes, primary first.
    pub fn sizes(&self) -> impl Iterator<Item = AdSize> + '_ {
        std::iter::once(self.size).chain(self.additional_sizes.iter().copied())
    }
}

/// Failure reported by the ad request client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("demand fetch failed with code {code}: {message}")]
pub struct FetchFailure {
    pub code: i32,
    pub message: String,
}

/// Result of one demand fetch, as delivered to the completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The ad loaded. Carries the resolved creative size, if one was found.
    Success(Option<AdSize>),
    /// The fetch or the ad load failed.
    Failure(FetchFailure),
}

impl FetchOutcome {
    /// Ad loaded with a resolved creative size.
    pub fn loaded(size: AdSize) -> Self {
        Self::Success(Some(size))
    }

    /// Ad loaded but no creative size could be resolved.
    pub fn missing_size() -> Self {
        Self::Success(None)
    }

    /// Fetch failed.
    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self::Failure(FetchFailure {
            code,
            message: message.into(),
        })
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(Some(_)) => "success",
            Self::Success(None) => "missing_size",
            Self::Failure(_) => "failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_size_parse_and_display() {
        let size: AdSize = "728x90".parse().unwrap();
        assert_eq!(size, AdSize::new(728, 90));
        assert_eq!(size.to_string(), "728x90");

        let size: AdSize = " 300 X 250 ".parse().unwrap();
        assert_eq!(size, AdSize::new(300, 250));
    }

    #[test]
    fn test_ad_size_parse_invalid() {
        for input in ["", "300", "x250", "300x", "axb", "300x250x1"] {
            let err = input.parse::<AdSize>().unwrap_err();
            assert_eq!(err, ParseAdSizeError(input.to_string()));
        }
    }

    #[test]
    fn test_ad_size_serializes_as_string() {
        let json = serde_json::to_string(&AdSize::new(320, 50)).unwrap();
        assert_eq!(json, "\"320x50\"");

        let parsed: AdSize = serde_json::from_str("\"320x50\"").unwrap();
        assert_eq!(parsed, AdSize::new(320, 50));
    }

    #[test]
    fn test_ad_size_is_empty() {
        assert!(AdSize::new(0, 250).is_empty());
        assert!(AdSize::new(300, 0).is_empty());
        assert!(!AdSize::new(1, 1).is_empty());
    }

    #[test]
    fn test_add_additional_size() {
        let mut payload = RequestPayload::new("1001-1", AdSize::new(300, 250));

        assert!(payload.add_additional_size(AdSize::new(728, 90)));
        assert_eq!(payload.additional_sizes, vec![AdSize::new(728, 90)]);

        // Duplicates of either the primary or an additional size are ignored.
        assert!(!payload.add_additional_size(AdSize::new(728, 90)));
        assert!(!payload.add_additional_size(AdSize::new(300, 250)));
        assert_eq!(payload.additional_sizes.len(), 1);

        let sizes: Vec<_> = payload.sizes().collect();
        assert_eq!(sizes, vec![AdSize::new(300, 250), AdSize::new(728, 90)]);
    }

    #[test]
    fn test_payload_serialization_skips_empty_sizes() {
        let payload = RequestPayload::new("1001-1", AdSize::new(300, 250));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["config_id"], "1001-1");
        assert_eq!(json["size"], "300x250");
        assert!(json.get("additional_sizes").is_none());
    }

    #[test]
    fn test_fetch_outcome_labels() {
        assert_eq!(FetchOutcome::loaded(AdSize::new(1, 1)).label(), "success");
        assert_eq!(FetchOutcome::missing_size().label(), "missing_size");
        assert_eq!(FetchOutcome::failed(3, "no fill").label(), "failure");
    }

    #[test]
    fn test_fetch_failure_display() {
        let failure = FetchFailure {
            code: 3,
            message: "no fill".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "demand fetch failed with code 3: no fill"
        );
    }
}
