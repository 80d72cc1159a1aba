//! Season aggregation across a calendar year's events.
//!
//! A pure, deterministic transform over a snapshot of stored records:
//! identical input always yields identical output, so it is safe to
//! evaluate concurrently for different years.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Course, Event, Player, ScoreRecord, HOLE_COUNT};
use crate::penalty::round_penalty;

/// One qualifying round in a player's season breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventScore {
    pub event_id: Uuid,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub total: u32,
    pub penalty: i64,
}

/// Per-player roll-up across a season's qualifying rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeason {
    pub player_id: Uuid,
    pub name: String,
    pub event_count: u32,
    pub total_strokes: u32,
    pub total_putts: u32,
    pub total_penalty: i64,
    pub best_score: Option<u32>,
    /// Mean round total, rounded to one decimal. `None` until the
    /// player has a qualifying round.
    pub avg_score: Option<f64>,
    pub event_scores: Vec<EventScore>,
}

impl PlayerSeason {
    fn new(player_id: Uuid, name: String) -> Self {
        Self {
            player_id,
            name,
            event_count: 0,
            total_strokes: 0,
            total_putts: 0,
            total_penalty: 0,
            best_score: None,
            avg_score: None,
            event_scores: Vec::new(),
        }
    }
}

/// Event reference included in the season response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonEvent {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
}

/// Two orderings over the same per-player records: by scoring average
/// (ascending, best golfer first) and by penalty total (descending,
/// deepest pockets first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub year: i32,
    pub events: Vec<SeasonEvent>,
    pub rankings: Vec<PlayerSeason>,
    pub penalties: Vec<PlayerSeason>,
}

/// Aggregates a calendar year of score records into per-player season
/// roll-ups.
///
/// A round counts only when the player has all 18 hole records for the
/// event; partial rounds are excluded entirely, never pro-rated. That
/// exclusion is deliberate policy, not an error.
pub fn aggregate_season(
    year: i32,
    events: &[(Event, Course)],
    scores: &[ScoreRecord],
    players: &[Player],
) -> SeasonSummary {
    let name_of = |player_id: Uuid| -> String {
        players
            .iter()
            .find(|p| p.id == player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "unknown".to_string())
    };

    let mut in_year: Vec<&(Event, Course)> = events
        .iter()
        .filter(|(e, _)| e.event_date.year() == year)
        .collect();
    in_year.sort_by_key(|(e, _)| (e.event_date, e.id));

    // BTreeMap keeps accumulation order independent of input order.
    let mut stats: BTreeMap<Uuid, PlayerSeason> = BTreeMap::new();

    for (event, course) in &in_year {
        let mut by_player: BTreeMap<Uuid, Vec<&ScoreRecord>> = BTreeMap::new();
        for record in scores.iter().filter(|s| s.event_id == event.id) {
            by_player.entry(record.player_id).or_default().push(record);
        }

        for (player_id, records) in by_player {
            // Partial rounds never count toward the season.
            if records.len() != HOLE_COUNT {
                continue;
            }

            let total: u32 = records.iter().map(|r| r.strokes).sum();
            let putts: u32 = records.iter().map(|r| r.putts).sum();
            let owned: Vec<ScoreRecord> = records.into_iter().cloned().collect();
            let penalty = round_penalty(&owned, course);

            let entry = stats
                .entry(player_id)
                .or_insert_with(|| PlayerSeason::new(player_id, name_of(player_id)));
            entry.event_count += 1;
            entry.total_strokes += total;
            entry.total_putts += putts;
            entry.total_penalty += penalty;
            entry.best_score = Some(entry.best_score.map_or(total, |best| best.min(total)));
            entry.event_scores.push(EventScore {
                event_id: event.id,
                event_name: event.name.clone(),
                event_date: event.event_date,
                total,
                penalty,
            });
        }
    }

    let mut rankings: Vec<PlayerSeason> = stats
        .into_values()
        .map(|mut s| {
            if s.event_count > 0 {
                let avg = s.total_strokes as f64 / s.event_count as f64;
                s.avg_score = Some((avg * 10.0).round() / 10.0);
            }
            s
        })
        .collect();

    rankings.sort_by(|a, b| {
        match (a.avg_score, b.avg_score) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let mut penalties = rankings.clone();
    penalties.sort_by(|a, b| {
        b.total_penalty
            .cmp(&a.total_penalty)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    SeasonSummary {
        year,
        events: in_year
            .iter()
            .map(|(e, _)| SeasonEvent {
                id: e.id,
                name: e.name.clone(),
                event_date: e.event_date,
            })
            .collect(),
        rankings,
        penalties,
    }
}
