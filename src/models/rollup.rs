use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Runner,
    TowerDefense,
    Puzzle,
    Platformer,
    Shooter,
    Arcade,
    Logic,
    Other,
}

impl Genre {
    pub const ALL: [Genre; 8] = [
        Genre::Runner,
        Genre::TowerDefense,
        Genre::Puzzle,
        Genre::Platformer,
        Genre::Shooter,
        Genre::Arcade,
        Genre::Logic,
        Genre::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Runner => "runner",
            Genre::TowerDefense => "tower_defense",
            Genre::Puzzle => "puzzle",
            Genre::Platformer => "platformer",
            Genre::Shooter => "shooter",
            Genre::Arcade => "arcade",
            Genre::Logic => "logic",
            Genre::Other => "other",
        }
    }

    /// Lenient parse used at the storage boundary: unknown tags become `Other`.
    pub fn from_tag(tag: &str) -> Genre {
        tag.parse().unwrap_or_else(|_| {
            log::warn!("Unknown genre tag {tag:?}, scoring as \"other\"");
            Genre::Other
        })
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .iter()
            .copied()
            .find(|genre| genre.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown genre: {s}"))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregated row per game, as read from `game_engagement_rollup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRollupRow {
    pub game_id: String,
    pub genre: Genre,
    pub sessions: i64,
    pub completions: i64,
    pub total_seconds: f64,
    pub restarts: i64,
    pub shares: i64,
    pub abandons: i64,
    pub favorites: i64,
}

/// Wire shape of a rollup row before defaults are applied.
///
/// `favorites` may be missing or null upstream; `genre` is an open tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupRecord {
    pub game_id: String,
    pub genre: String,
    #[serde(default)]
    pub sessions: i64,
    #[serde(default)]
    pub completions: i64,
    #[serde(default)]
    pub total_seconds: f64,
    #[serde(default)]
    pub restarts: i64,
    #[serde(default)]
    pub shares: i64,
    #[serde(default)]
    pub abandons: i64,
    #[serde(default)]
    pub favorites: Option<i64>,
}

impl From<RollupRecord> for EngagementRollupRow {
    fn from(record: RollupRecord) -> Self {
        EngagementRollupRow {
            genre: Genre::from_tag(&record.genre),
            game_id: record.game_id,
            sessions: record.sessions,
            completions: record.completions,
            total_seconds: record.total_seconds,
            restarts: record.restarts,
            shares: record.shares,
            abandons: record.abandons,
            favorites: record.favorites.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_tags_round_trip() {
        for genre in Genre::ALL {
            assert_eq!(genre.as_str().parse::<Genre>(), Ok(genre));
        }
        assert_eq!(
            serde_json::to_string(&Genre::TowerDefense).unwrap(),
            "\"tower_defense\""
        );
    }

    #[test]
    fn unknown_genre_tag_falls_back_to_other() {
        assert_eq!(Genre::from_tag("racing"), Genre::Other);
        assert!("racing".parse::<Genre>().is_err());
    }

    #[test]
    fn missing_or_null_favorites_default_to_zero() {
        let missing: RollupRecord = serde_json::from_str(
            r#"{"game_id":"g1","genre":"puzzle","sessions":4,"completions":2,"total_seconds":80.0,"restarts":1,"shares":0,"abandons":2}"#,
        )
        .unwrap();
        let null: RollupRecord = serde_json::from_str(
            r#"{"game_id":"g2","genre":"puzzle","sessions":4,"favorites":null}"#,
        )
        .unwrap();

        assert_eq!(EngagementRollupRow::from(missing).favorites, 0);
        let row = EngagementRollupRow::from(null);
        assert_eq!(row.favorites, 0);
        assert_eq!(row.completions, 0);
        assert_eq!(row.genre, Genre::Puzzle);
    }
}
