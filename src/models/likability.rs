use crate::models::rollup::Genre;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const METRIC_COUNT: usize = 6;

/// The six behavioral ratios a likability score is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    CompletionRate,
    AverageSessionSeconds,
    RestartToCompleteRatio,
    ShareRate,
    FavoriteRate,
    AbandonmentRate,
}

impl MetricKey {
    pub const ALL: [MetricKey; METRIC_COUNT] = [
        MetricKey::CompletionRate,
        MetricKey::AverageSessionSeconds,
        MetricKey::RestartToCompleteRatio,
        MetricKey::ShareRate,
        MetricKey::FavoriteRate,
        MetricKey::AbandonmentRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::CompletionRate => "completionRate",
            MetricKey::AverageSessionSeconds => "averageSessionSeconds",
            MetricKey::RestartToCompleteRatio => "restartToCompleteRatio",
            MetricKey::ShareRate => "shareRate",
            MetricKey::FavoriteRate => "favoriteRate",
            MetricKey::AbandonmentRate => "abandonmentRate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricKey::CompletionRate => "Completion rate",
            MetricKey::AverageSessionSeconds => "Average session length (s)",
            MetricKey::RestartToCompleteRatio => "Restarts per completion",
            MetricKey::ShareRate => "Share rate",
            MetricKey::FavoriteRate => "Favorite rate",
            MetricKey::AbandonmentRate => "Abandonment rate",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("Unknown metric key: {s}"))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Six ratios for one game, either raw (observed) or normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricVector {
    pub completion_rate: f64,
    pub average_session_seconds: f64,
    pub restart_to_complete_ratio: f64,
    pub share_rate: f64,
    pub favorite_rate: f64,
    pub abandonment_rate: f64,
}

impl MetricVector {
    pub fn get(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::CompletionRate => self.completion_rate,
            MetricKey::AverageSessionSeconds => self.average_session_seconds,
            MetricKey::RestartToCompleteRatio => self.restart_to_complete_ratio,
            MetricKey::ShareRate => self.share_rate,
            MetricKey::FavoriteRate => self.favorite_rate,
            MetricKey::AbandonmentRate => self.abandonment_rate,
        }
    }

    pub fn map<F>(&self, mut f: F) -> MetricVector
    where
        F: FnMut(MetricKey, f64) -> f64,
    {
        MetricVector {
            completion_rate: f(MetricKey::CompletionRate, self.completion_rate),
            average_session_seconds: f(MetricKey::AverageSessionSeconds, self.average_session_seconds),
            restart_to_complete_ratio: f(MetricKey::RestartToCompleteRatio, self.restart_to_complete_ratio),
            share_rate: f(MetricKey::ShareRate, self.share_rate),
            favorite_rate: f(MetricKey::FavoriteRate, self.favorite_rate),
            abandonment_rate: f(MetricKey::AbandonmentRate, self.abandonment_rate),
        }
    }
}

/// Which weight table supplied a component's weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WeightSource {
    Global,
    Genre(Genre),
}

impl WeightSource {
    pub fn as_str(self) -> &'static str {
        match self {
            WeightSource::Global => "global",
            WeightSource::Genre(genre) => genre.as_str(),
        }
    }
}

impl From<WeightSource> for String {
    fn from(source: WeightSource) -> Self {
        source.as_str().to_string()
    }
}

impl TryFrom<String> for WeightSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "global" {
            return Ok(WeightSource::Global);
        }
        value.parse().map(WeightSource::Genre)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikabilityComponent {
    pub key: MetricKey,
    pub label: String,
    pub weight: f64,
    pub genre: WeightSource,
    pub observed_value: f64,
    pub normalized_value: f64,
}

impl LikabilityComponent {
    pub fn contribution(&self) -> f64 {
        self.normalized_value * self.weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikabilityScore {
    pub game_id: String,
    pub genre: Genre,
    pub score: f64,
    pub components: Vec<LikabilityComponent>,
    pub computed_at: DateTime<Utc>,
    pub sample_size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_keys_use_camel_case_names() {
        assert_eq!(MetricKey::RestartToCompleteRatio.as_str(), "restartToCompleteRatio");
        assert_eq!(
            serde_json::to_string(&MetricKey::AverageSessionSeconds).unwrap(),
            "\"averageSessionSeconds\""
        );
        for key in MetricKey::ALL {
            assert_eq!(key.as_str().parse::<MetricKey>(), Ok(key));
        }
    }

    #[test]
    fn metric_key_index_matches_declaration_order() {
        for (position, key) in MetricKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), position);
        }
    }

    #[test]
    fn weight_source_serializes_as_plain_tag() {
        assert_eq!(serde_json::to_string(&WeightSource::Global).unwrap(), "\"global\"");
        assert_eq!(
            serde_json::to_string(&WeightSource::Genre(Genre::TowerDefense)).unwrap(),
            "\"tower_defense\""
        );
        let parsed: WeightSource = serde_json::from_str("\"runner\"").unwrap();
        assert_eq!(parsed, WeightSource::Genre(Genre::Runner));
        let parsed: WeightSource = serde_json::from_str("\"global\"").unwrap();
        assert_eq!(parsed, WeightSource::Global);
    }
}
