use crate::models::likability::{MetricKey, WeightSource, METRIC_COUNT};
use crate::models::rollup::Genre;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A weight for every metric. The global table always has this shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricWeights([f64; METRIC_COUNT]);

impl MetricWeights {
    pub const fn new(
        completion_rate: f64,
        average_session_seconds: f64,
        restart_to_complete_ratio: f64,
        share_rate: f64,
        favorite_rate: f64,
        abandonment_rate: f64,
    ) -> Self {
        MetricWeights([
            completion_rate,
            average_session_seconds,
            restart_to_complete_ratio,
            share_rate,
            favorite_rate,
            abandonment_rate,
        ])
    }

    pub fn get(&self, key: MetricKey) -> f64 {
        self.0[key.index()]
    }

    pub fn set(&mut self, key: MetricKey, weight: f64) {
        self.0[key.index()] = weight;
    }
}

/// Per-genre overrides; a missing key defers to the global weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialWeights([Option<f64>; METRIC_COUNT]);

impl PartialWeights {
    pub fn get(&self, key: MetricKey) -> Option<f64> {
        self.0[key.index()]
    }

    pub fn set(&mut self, key: MetricKey, weight: f64) {
        self.0[key.index()] = Some(weight);
    }
}

impl From<MetricWeights> for PartialWeights {
    fn from(weights: MetricWeights) -> Self {
        PartialWeights(weights.0.map(Some))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWeight {
    pub weight: f64,
    pub source: WeightSource,
}

pub const GLOBAL_WEIGHTS: MetricWeights = MetricWeights::new(0.25, 0.25, -0.15, 0.20, 0.20, -0.15);
const RUNNER_WEIGHTS: MetricWeights = MetricWeights::new(0.15, 0.35, -0.20, 0.30, 0.20, -0.20);
const TOWER_DEFENSE_WEIGHTS: MetricWeights = MetricWeights::new(0.35, 0.20, -0.10, 0.15, 0.30, -0.10);
const PUZZLE_WEIGHTS: MetricWeights = MetricWeights::new(0.30, 0.20, -0.10, 0.20, 0.30, -0.10);
const ARCADE_WEIGHTS: MetricWeights = MetricWeights::new(0.25, 0.25, -0.15, 0.20, 0.20, -0.15);

/// Immutable genre → weights configuration with a guaranteed global entry.
///
/// Resolution is key by key: a genre override wins for the metrics it
/// names, every other metric takes the global weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    global: MetricWeights,
    overrides: BTreeMap<Genre, PartialWeights>,
}

impl Default for WeightTable {
    fn default() -> Self {
        let mut overrides = BTreeMap::new();
        overrides.insert(Genre::Runner, RUNNER_WEIGHTS.into());
        overrides.insert(Genre::TowerDefense, TOWER_DEFENSE_WEIGHTS.into());
        overrides.insert(Genre::Puzzle, PUZZLE_WEIGHTS.into());
        overrides.insert(Genre::Arcade, ARCADE_WEIGHTS.into());

        WeightTable {
            global: GLOBAL_WEIGHTS,
            overrides,
        }
    }
}

impl WeightTable {
    pub fn new(global: MetricWeights) -> Self {
        WeightTable {
            global,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, genre: Genre, weights: PartialWeights) -> Self {
        self.overrides.insert(genre, weights);
        self
    }

    pub fn global(&self) -> &MetricWeights {
        &self.global
    }

    /// Weight for `key` when scoring a game of `genre`.
    ///
    /// Only the game's own genre table and the global table are consulted.
    /// A genre without a table does not borrow from the `arcade` table, so an
    /// `arcade` override in settings applies to arcade games alone.
    pub fn resolve(&self, genre: Genre, key: MetricKey) -> ResolvedWeight {
        match self.overrides.get(&genre).and_then(|weights| weights.get(key)) {
            Some(weight) => ResolvedWeight {
                weight,
                source: WeightSource::Genre(genre),
            },
            None => ResolvedWeight {
                weight: self.global.get(key),
                source: WeightSource::Global,
            },
        }
    }

    /// Build a table from the settings shape
    /// `{"global": {metricKey: w}, "<genre>": {metricKey: w}}`.
    ///
    /// Global keys missing from `value` keep their defaults; unknown genres,
    /// unknown metric keys and non-finite weights are ignored.
    pub fn from_json(value: &Value) -> Self {
        let mut table = WeightTable::default();
        let Some(obj) = value.as_object() else {
            return table;
        };

        if let Some(global) = obj.get("global").and_then(Value::as_object) {
            for (key, weight) in parse_weight_entries(global) {
                table.global.set(key, weight);
            }
        }

        for (name, entries) in obj {
            if name == "global" {
                continue;
            }
            let Ok(genre) = name.parse::<Genre>() else {
                log::warn!("Ignoring weights for unknown genre {name:?}");
                continue;
            };
            let Some(entries) = entries.as_object() else {
                continue;
            };

            let mut partial = PartialWeights::default();
            for (key, weight) in parse_weight_entries(entries) {
                partial.set(key, weight);
            }
            table.overrides.insert(genre, partial);
        }

        table
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        let global: Map<String, Value> = MetricKey::ALL
            .iter()
            .map(|key| (key.as_str().to_string(), json!(self.global.get(*key))))
            .collect();
        out.insert("global".to_string(), Value::Object(global));

        for (genre, partial) in &self.overrides {
            let entries: Map<String, Value> = MetricKey::ALL
                .iter()
                .filter_map(|key| partial.get(*key).map(|w| (key.as_str().to_string(), json!(w))))
                .collect();
            out.insert(genre.as_str().to_string(), Value::Object(entries));
        }

        Value::Object(out)
    }
}

fn parse_weight_entries(entries: &Map<String, Value>) -> Vec<(MetricKey, f64)> {
    entries
        .iter()
        .filter_map(|(key, value)| {
            let key = key.parse::<MetricKey>().ok()?;
            let weight = value.as_f64().filter(|w| w.is_finite())?;
            Some((key, weight))
        })
        .collect()
}
