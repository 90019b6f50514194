use crate::models::likability::MetricVector;
use crate::models::rollup::EngagementRollupRow;

/// Division that yields 0 instead of NaN/inf when the denominator is zero.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Convert one rollup row into its six behavioral ratios.
///
/// Counts are not validated: negative or inconsistent values flow through
/// unchanged, only the zero-denominator cases are guarded.
pub fn extract_metrics(row: &EngagementRollupRow) -> MetricVector {
    let sessions = row.sessions as f64;

    MetricVector {
        completion_rate: safe_divide(row.completions as f64, sessions),
        average_session_seconds: safe_divide(row.total_seconds, sessions),
        // Floor of one completion: restarts with zero completions stay large.
        restart_to_complete_ratio: row.restarts as f64 / row.completions.max(1) as f64,
        share_rate: safe_divide(row.shares as f64, sessions),
        favorite_rate: safe_divide(row.favorites as f64, sessions),
        abandonment_rate: safe_divide(row.abandons as f64, sessions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rollup::Genre;

    fn row(sessions: i64, completions: i64, restarts: i64) -> EngagementRollupRow {
        EngagementRollupRow {
            game_id: "g".to_string(),
            genre: Genre::Puzzle,
            sessions,
            completions,
            total_seconds: 300.0,
            restarts,
            shares: 3,
            abandons: 2,
            favorites: 1,
        }
    }

    #[test]
    fn zero_sessions_yield_zero_rates() {
        let metrics = extract_metrics(&row(0, 4, 0));

        assert_eq!(metrics.completion_rate, 0.0);
        assert_eq!(metrics.average_session_seconds, 0.0);
        assert_eq!(metrics.share_rate, 0.0);
        assert_eq!(metrics.favorite_rate, 0.0);
        assert_eq!(metrics.abandonment_rate, 0.0);
    }

    #[test]
    fn restarts_without_completions_keep_their_magnitude() {
        let metrics = extract_metrics(&row(10, 0, 7));
        assert_eq!(metrics.restart_to_complete_ratio, 7.0);
    }

    #[test]
    fn computes_session_denominated_ratios() {
        let metrics = extract_metrics(&row(10, 5, 10));

        assert!((metrics.completion_rate - 0.5).abs() < 1e-12);
        assert!((metrics.average_session_seconds - 30.0).abs() < 1e-12);
        assert!((metrics.restart_to_complete_ratio - 2.0).abs() < 1e-12);
        assert!((metrics.share_rate - 0.3).abs() < 1e-12);
        assert!((metrics.favorite_rate - 0.1).abs() < 1e-12);
        assert!((metrics.abandonment_rate - 0.2).abs() < 1e-12);
    }

    #[test]
    fn inconsistent_counts_pass_through_unvalidated() {
        let metrics = extract_metrics(&row(2, 5, 0));
        assert!((metrics.completion_rate - 2.5).abs() < 1e-12);
    }
}
