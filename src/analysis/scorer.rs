use crate::analysis::weights::WeightTable;
use crate::models::likability::{LikabilityComponent, LikabilityScore, MetricKey, MetricVector};
use crate::models::rollup::EngagementRollupRow;
use chrono::{DateTime, Utc};

/// Combine a game's observed and normalized metrics into a likability score.
///
/// Iteration always covers all six metrics; the weight of each comes from
/// the game's genre table when it names that metric, else the global one.
pub fn score_game(
    row: &EngagementRollupRow,
    observed: &MetricVector,
    normalized: &MetricVector,
    weights: &WeightTable,
    computed_at: DateTime<Utc>,
) -> LikabilityScore {
    let components: Vec<LikabilityComponent> = MetricKey::ALL
        .iter()
        .map(|&key| {
            let resolved = weights.resolve(row.genre, key);
            LikabilityComponent {
                key,
                label: key.label().to_string(),
                weight: resolved.weight,
                genre: resolved.source,
                observed_value: observed.get(key),
                normalized_value: normalized.get(key),
            }
        })
        .collect();

    let score = components.iter().map(LikabilityComponent::contribution).sum();

    LikabilityScore {
        game_id: row.game_id.clone(),
        genre: row.genre,
        score,
        components,
        computed_at,
        sample_size: row.sessions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::weights::GLOBAL_WEIGHTS;
    use crate::models::likability::WeightSource;
    use crate::models::rollup::Genre;

    fn row(genre: Genre) -> EngagementRollupRow {
        EngagementRollupRow {
            game_id: "g1".to_string(),
            genre,
            sessions: 12,
            completions: 6,
            total_seconds: 600.0,
            restarts: 3,
            shares: 1,
            abandons: 6,
            favorites: 2,
        }
    }

    fn all(value: f64) -> MetricVector {
        MetricVector::default().map(|_, _| value)
    }

    #[test]
    fn emits_one_component_per_metric_in_order() {
        let score = score_game(&row(Genre::Runner), &all(0.5), &all(0.5), &WeightTable::default(), Utc::now());

        let keys: Vec<MetricKey> = score.components.iter().map(|c| c.key).collect();
        assert_eq!(keys, MetricKey::ALL.to_vec());
        assert_eq!(score.sample_size, 12);
        assert_eq!(score.genre, Genre::Runner);
    }

    #[test]
    fn score_is_sum_of_weighted_normalized_values() {
        let score = score_game(&row(Genre::Puzzle), &all(3.0), &all(1.0), &WeightTable::default(), Utc::now());

        // Puzzle weights: 0.30 + 0.20 - 0.10 + 0.20 + 0.30 - 0.10
        assert!((score.score - 0.80).abs() < 1e-9);
        let summed: f64 = score.components.iter().map(|c| c.weight * c.normalized_value).sum();
        assert!((score.score - summed).abs() < 1e-12);
        assert!(score.components.iter().all(|c| c.observed_value == 3.0));
    }

    #[test]
    fn unknown_genre_uses_global_weights() {
        let score = score_game(&row(Genre::Other), &all(1.0), &all(1.0), &WeightTable::default(), Utc::now());

        for component in &score.components {
            assert_eq!(component.weight, GLOBAL_WEIGHTS.get(component.key));
            assert_eq!(component.genre, WeightSource::Global);
        }
        assert!((score.score - 0.60).abs() < 1e-9);
    }

    #[test]
    fn zero_normalized_values_score_zero() {
        let score = score_game(&row(Genre::Arcade), &all(4.0), &all(0.0), &WeightTable::default(), Utc::now());
        assert_eq!(score.score, 0.0);
    }
}
