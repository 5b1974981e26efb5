//! Pipeline configuration.
//!
//! Pipelines are configured from a flat string map (`PipelineParams`), the
//! shape the surrounding ingestion configuration hands out. The map is
//! validated once into a typed [`PipelineConfig`]; a malformed map never
//! produces a running pipeline.

use mediaseg_core::{defaults, Distance, Result, SegmentError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Unit applied to a duration value written without a suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Micros,
    Millis,
    Seconds,
}

impl TimeUnit {
    fn to_micros(self, value: i64) -> Option<i64> {
        match self {
            Self::Micros => Some(value),
            Self::Millis => value.checked_mul(1_000),
            Self::Seconds => value.checked_mul(1_000_000),
        }
    }
}

/// Parse `"500"`, `"500ms"`, `"2s"` or `"40us"` into signed microseconds.
pub fn parse_micros(text: &str, default_unit: TimeUnit) -> Option<i64> {
    let text = text.trim();
    let (digits, unit) = if let Some(v) = text.strip_suffix("us") {
        (v, TimeUnit::Micros)
    } else if let Some(v) = text.strip_suffix("ms") {
        (v, TimeUnit::Millis)
    } else if let Some(v) = text.strip_suffix('s') {
        (v, TimeUnit::Seconds)
    } else {
        (text, default_unit)
    };
    let value: i64 = digits.trim().parse().ok()?;
    unit.to_micros(value)
}

/// Flat key/value configuration of one pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineParams(BTreeMap<String, String>);

impl PipelineParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse `key=value` arguments, e.g. from a command line.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| SegmentError::config(pair, "is not of the form key=value"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(SegmentError::config(pair, "has an empty key"));
            }
            params.insert(key, value.trim());
        }
        Ok(params)
    }

    /// Parse a JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            SegmentError::Serialization(format!("Failed to parse pipeline parameters: {e}"))
        })
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| SegmentError::config(key, "must be specified"))
    }

    fn micros(&self, key: &str, unit: TimeUnit) -> Result<Option<i64>> {
        self.get(key)
            .map(|raw| {
                parse_micros(raw, unit)
                    .ok_or_else(|| SegmentError::config(key, format!("is not a duration: '{raw}'")))
            })
            .transpose()
    }

    /// A strictly positive duration.
    fn positive_duration(&self, key: &str, unit: TimeUnit) -> Result<Option<Duration>> {
        match self.micros(key, unit)? {
            Some(us) if us <= 0 => Err(SegmentError::config(key, "must be positive")),
            Some(us) => Ok(Some(Duration::from_micros(us as u64))),
            None => Ok(None),
        }
    }

    /// A duration that may be zero.
    fn non_negative_duration(&self, key: &str, unit: TimeUnit) -> Result<Option<Duration>> {
        match self.micros(key, unit)? {
            Some(us) if us < 0 => Err(SegmentError::config(key, "must not be negative")),
            Some(us) => Ok(Some(Duration::from_micros(us as u64))),
            None => Ok(None),
        }
    }

    fn float(&self, key: &str) -> Result<Option<f64>> {
        self.get(key)
            .map(|raw| match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(SegmentError::config(key, format!("is not a number: '{raw}'"))),
            })
            .transpose()
    }

    fn count(&self, key: &str) -> Result<Option<usize>> {
        self.get(key)
            .map(|raw| match raw.trim().parse::<usize>() {
                Ok(v) if v > 0 => Ok(v),
                _ => Err(SegmentError::config(key, format!("must be a positive integer, got '{raw}'"))),
            })
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PipelineParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Fixed-duration windows aligned to time zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDurationConfig {
    pub duration: Duration,
    pub look_ahead: Duration,
}

impl FixedDurationConfig {
    pub fn new(duration: Duration, look_ahead: Duration) -> Result<Self> {
        if duration.is_zero() {
            return Err(SegmentError::config("duration", "must be positive"));
        }
        Ok(Self {
            duration,
            look_ahead,
        })
    }

    fn from_params(params: &PipelineParams) -> Result<Self> {
        let duration = params
            .positive_duration("duration", TimeUnit::Seconds)?
            .ok_or_else(|| SegmentError::config("duration", "must be specified"))?;
        let look_ahead = params
            .non_negative_duration("lookAheadTime", TimeUnit::Seconds)?
            .unwrap_or(defaults::LOOK_AHEAD);
        Self::new(duration, look_ahead)
    }
}

/// Windows taken from an externally supplied shot-boundary list.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotBoundaryConfig {
    /// Name the injected boundary provider must answer to.
    pub provider: String,
    /// Boundary set passed to the provider on lookup.
    pub set_name: String,
    /// Shots ending no further than this past the cursor are merged into the next.
    pub tolerance: Duration,
    pub look_ahead: Duration,
    /// Window length used when no list is available.
    pub fallback: Duration,
}

impl ShotBoundaryConfig {
    fn from_params(params: &PipelineParams) -> Result<Self> {
        let provider = params.require("sbProvider")?.to_string();
        let set_name = params.require("sbName")?.to_string();
        let tolerance = params
            .non_negative_duration("tolerance", TimeUnit::Millis)?
            .ok_or_else(|| SegmentError::config("tolerance", "must be specified"))?;
        let look_ahead = params
            .non_negative_duration("lookAheadTime", TimeUnit::Millis)?
            .unwrap_or(defaults::LOOK_AHEAD);
        let fallback = params
            .positive_duration("duration", TimeUnit::Millis)?
            .unwrap_or(defaults::FALLBACK_WINDOW);
        Ok(Self {
            provider,
            set_name,
            tolerance,
            look_ahead,
            fallback,
        })
    }
}

/// Windows that break when a frame's descriptor drifts out of range.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorDistanceConfig {
    pub distance: Distance,
    /// Extractor whose descriptors are compared.
    pub author: String,
    /// Inclusive lower bound of the accepted distance.
    pub at_least: f64,
    /// Inclusive upper bound of the accepted distance.
    pub at_most: f64,
}

impl DescriptorDistanceConfig {
    /// At least one bound must be set; a missing bound is unbounded.
    pub fn new(
        distance: Distance,
        author: impl Into<String>,
        at_least: Option<f64>,
        at_most: Option<f64>,
    ) -> Result<Self> {
        let author = author.into();
        if author.is_empty() {
            return Err(SegmentError::config("authorName", "must not be empty"));
        }
        if at_least.is_none() && at_most.is_none() {
            return Err(SegmentError::config(
                "atLeast",
                "or 'atMost' must be specified",
            ));
        }
        let at_least = at_least.unwrap_or(f64::NEG_INFINITY);
        let at_most = at_most.unwrap_or(f64::INFINITY);
        if at_least > at_most {
            return Err(SegmentError::config(
                "atLeast",
                format!("({at_least}) must not exceed 'atMost' ({at_most})"),
            ));
        }
        Ok(Self {
            distance,
            author,
            at_least,
            at_most,
        })
    }

    fn from_params(params: &PipelineParams) -> Result<Self> {
        let raw = params.require("distance")?;
        let distance: Distance = raw
            .parse()
            .map_err(|e| SegmentError::config("distance", format!("{e}")))?;
        let author = params.require("authorName")?;
        Self::new(
            distance,
            author,
            params.float("atLeast")?,
            params.float("atMost")?,
        )
    }

    /// Whether `distance` keeps a frame in the current window.
    pub fn in_range(&self, distance: f64) -> bool {
        distance >= self.at_least && distance <= self.at_most
    }
}

/// Which policy a pipeline runs, with its validated parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyConfig {
    FixedDuration(FixedDurationConfig),
    ShotBoundary(ShotBoundaryConfig),
    DescriptorDistance(DescriptorDistanceConfig),
    PassThrough,
}

impl PolicyConfig {
    pub fn from_params(params: &PipelineParams) -> Result<Self> {
        let kind = params.require("type")?;
        match kind.to_ascii_lowercase().as_str() {
            "fixed" | "fixedduration" => {
                FixedDurationConfig::from_params(params).map(Self::FixedDuration)
            }
            "shotboundary" | "externalboundary" => {
                ShotBoundaryConfig::from_params(params).map(Self::ShotBoundary)
            }
            "descriptordistance" | "contentdistance" => {
                DescriptorDistanceConfig::from_params(params).map(Self::DescriptorDistance)
            }
            "passthrough" => Ok(Self::PassThrough),
            other => Err(SegmentError::config(
                "type",
                format!("names no known policy: '{other}'"),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedDuration(_) => "fixed",
            Self::ShotBoundary(_) => "shotBoundary",
            Self::DescriptorDistance(_) => "descriptorDistance",
            Self::PassThrough => "passThrough",
        }
    }
}

/// Complete configuration of one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub policy: PolicyConfig,
    /// Capacity of the segment output channel.
    pub channel_capacity: usize,
}

impl PipelineConfig {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            policy,
            channel_capacity: defaults::OUTPUT_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn from_params(params: &PipelineParams) -> Result<Self> {
        let policy = PolicyConfig::from_params(params)?;
        let channel_capacity = params
            .count("channelCapacity")?
            .unwrap_or(defaults::OUTPUT_CAPACITY);
        Ok(Self {
            policy,
            channel_capacity,
        })
    }
}
