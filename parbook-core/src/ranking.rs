//! Annual points ranking with a deterministic tie-break cascade.
//!
//! Consumes one standings row per (player, year) from the finalization
//! service and produces a total order:
//!
//! 1. total points, descending
//! 2. participation count, descending
//! 3. initial handicap, ascending
//! 4. birth year, ascending (older ranks higher; unknown ranks as
//!    youngest)
//! 5. player id, ascending (makes the order strict when every business
//!    tier ties)
//!
//! Ranks are dense sequential 1-based numbers. Tied rows are NOT
//! collapsed to a shared rank; the society has always published
//! "1, 2, 3" even for dead heats, so that behavior is preserved.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Player, SeasonStat};

/// Ranking input: a season stat joined with its player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStanding {
    pub player_id: Uuid,
    pub player_name: String,
    pub gender: Option<String>,
    pub birth_year: Option<i32>,
    pub initial_handicap: i32,
    pub current_handicap: i32,
    pub total_points: i64,
    pub participation_count: u32,
}

impl SeasonStanding {
    pub fn from_stat(stat: &SeasonStat, player: &Player) -> Self {
        Self {
            player_id: stat.player_id,
            player_name: player.name.clone(),
            gender: player.gender.clone(),
            birth_year: player.birth_year,
            initial_handicap: stat.initial_handicap,
            current_handicap: stat.current_handicap,
            total_points: stat.total_points,
            participation_count: stat.participation_count,
        }
    }
}

/// A standings row with its assigned rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub player_id: Uuid,
    pub player_name: String,
    pub gender: Option<String>,
    pub birth_year: Option<i32>,
    pub initial_handicap: i32,
    pub current_handicap: i32,
    pub total_points: i64,
    pub participation_count: u32,
}

/// The tie-break cascade. Strict: distinct rows never compare equal.
pub fn standing_order(a: &SeasonStanding, b: &SeasonStanding) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then_with(|| b.participation_count.cmp(&a.participation_count))
        .then_with(|| a.initial_handicap.cmp(&b.initial_handicap))
        .then_with(|| birth_key(a).cmp(&birth_key(b)))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

// Unknown birth year sorts after every known one.
fn birth_key(s: &SeasonStanding) -> i64 {
    s.birth_year.map(i64::from).unwrap_or(i64::MAX)
}

/// Orders standings and assigns dense sequential 1-based ranks.
pub fn annual_ranking(mut rows: Vec<SeasonStanding>) -> Vec<RankedEntry> {
    rows.sort_by(standing_order);
    rows.into_iter()
        .enumerate()
        .map(|(i, s)| RankedEntry {
            rank: (i + 1) as u32,
            player_id: s.player_id,
            player_name: s.player_name,
            gender: s.gender,
            birth_year: s.birth_year,
            initial_handicap: s.initial_handicap,
            current_handicap: s.current_handicap,
            total_points: s.total_points,
            participation_count: s.participation_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(points: i64, participation: u32, handicap: i32, birth: Option<i32>) -> SeasonStanding {
        SeasonStanding {
            player_id: Uuid::new_v4(),
            player_name: "P".to_string(),
            gender: None,
            birth_year: birth,
            initial_handicap: handicap,
            current_handicap: handicap,
            total_points: points,
            participation_count: participation,
        }
    }

    #[test]
    fn test_points_dominate() {
        let ranked = annual_ranking(vec![
            standing(10, 9, 0, Some(1950)),
            standing(30, 1, 20, None),
            standing(20, 5, 5, Some(1980)),
        ]);
        let points: Vec<i64> = ranked.iter().map(|r| r.total_points).collect();
        assert_eq!(points, vec![30, 20, 10]);
    }

    #[test]
    fn test_participation_breaks_point_ties() {
        let ranked = annual_ranking(vec![
            standing(20, 4, 0, None),
            standing(20, 8, 30, None),
        ]);
        assert_eq!(ranked[0].participation_count, 8);
        assert_eq!(ranked[1].participation_count, 4);
    }

    #[test]
    fn test_lower_handicap_ranks_higher() {
        let ranked = annual_ranking(vec![
            standing(20, 5, 18, None),
            standing(20, 5, 7, None),
        ]);
        assert_eq!(ranked[0].initial_handicap, 7);
        assert_eq!(ranked[1].initial_handicap, 18);
    }

    #[test]
    fn test_older_player_ranks_higher() {
        let ranked = annual_ranking(vec![
            standing(20, 5, 10, Some(1985)),
            standing(20, 5, 10, Some(1955)),
        ]);
        assert_eq!(ranked[0].birth_year, Some(1955));
        assert_eq!(ranked[1].birth_year, Some(1985));
    }

    #[test]
    fn test_unknown_birth_year_ranks_lowest() {
        let ranked = annual_ranking(vec![
            standing(20, 5, 10, None),
            standing(20, 5, 10, Some(1999)),
        ]);
        assert_eq!(ranked[0].birth_year, Some(1999));
        assert_eq!(ranked[1].birth_year, None);
    }

    #[test]
    fn test_dense_sequential_ranks_for_full_ties() {
        let a = standing(20, 5, 10, Some(1970));
        let mut b = a.clone();
        b.player_id = Uuid::new_v4();
        let mut c = a.clone();
        c.player_id = Uuid::new_v4();

        let ranked = annual_ranking(vec![a, b, c]);
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        // Dead heats still get 1, 2, 3 - never a shared rank.
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_strict_total_order() {
        let rows = vec![
            standing(20, 5, 10, Some(1970)),
            standing(20, 5, 10, Some(1970)),
            standing(20, 5, 10, None),
            standing(20, 8, 10, Some(1970)),
            standing(30, 5, 10, Some(1970)),
        ];
        // Exactly one of a<b / b<a for every distinct pair.
        for (i, a) in rows.iter().enumerate() {
            for (j, b) in rows.iter().enumerate() {
                if i == j {
                    continue;
                }
                let ab = standing_order(a, b);
                let ba = standing_order(b, a);
                assert_ne!(ab, Ordering::Equal);
                assert_eq!(ab, ba.reverse());
            }
        }
        // Transitivity over the full set.
        let mut sorted = rows.clone();
        sorted.sort_by(standing_order);
        for w in sorted.windows(2) {
            assert_eq!(standing_order(&w[0], &w[1]), Ordering::Less);
        }
    }
}
