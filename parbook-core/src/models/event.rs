use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::course::Course;
use super::player::Player;
use super::score::ScoreRecord;

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    InProgress,
    Completed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Upcoming => write!(f, "upcoming"),
            EventStatus::InProgress => write!(f, "in_progress"),
            EventStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upcoming" => Ok(EventStatus::Upcoming),
            "in_progress" => Ok(EventStatus::InProgress),
            "completed" => Ok(EventStatus::Completed),
            other => Err(format!("unknown event status: {}", other)),
        }
    }
}

/// Kind of society gathering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Regular monthly meet.
    Monthly,
    /// Special competition outside the monthly cadence.
    Special,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Monthly => write!(f, "monthly"),
            EventType::Special => write!(f, "special"),
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(EventType::Monthly),
            "special" => Ok(EventType::Special),
            other => Err(format!("unknown event type: {}", other)),
        }
    }
}

/// A scheduled round for the society.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub course_id: Uuid,
    pub status: EventStatus,
    pub event_type: EventType,
    /// Set by the finalization service once scores become immutable.
    pub is_finalized: bool,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        event_date: NaiveDate,
        course_id: Uuid,
        event_type: EventType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            event_date,
            course_id,
            status: EventStatus::Upcoming,
            event_type,
            is_finalized: false,
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }
}

/// Membership of a player in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub event_id: Uuid,
    pub player_id: Uuid,
}

/// One member of a playing group, in tee-off order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub player_id: Uuid,
    pub position: u32,
}

/// A playing group within an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventGroup {
    pub id: Uuid,
    pub event_id: Uuid,
    pub group_number: u32,
    pub start_time: Option<NaiveTime>,
    pub members: Vec<GroupMember>,
}

/// Full event payload served to the capture client: the event, its
/// course layout, participants, groups, and the current score snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetail {
    pub event: Event,
    pub course: Course,
    pub participants: Vec<Player>,
    pub groups: Vec<EventGroup>,
    pub scores: Vec<ScoreRecord>,
}

/// Resolves who a scorer enters scores for: the members of their own
/// group, or every participant when no group assignment exists.
pub fn scoring_members(detail: &EventDetail, scorer: Uuid) -> Vec<Player> {
    if let Some(group) = detail
        .groups
        .iter()
        .find(|g| g.members.iter().any(|m| m.player_id == scorer))
    {
        let mut members = group.members.clone();
        members.sort_by_key(|m| m.position);
        return members
            .iter()
            .filter_map(|m| {
                detail
                    .participants
                    .iter()
                    .find(|p| p.id == m.player_id)
                    .cloned()
            })
            .collect();
    }
    detail.participants.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::demo_pars;
    use crate::models::player::Role;

    fn detail_with_groups() -> (EventDetail, Uuid, Uuid) {
        let course = Course::new("Test Golf Club", demo_pars()).unwrap();
        let event = Event::new(
            "February Meet",
            NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            course.id,
            EventType::Monthly,
        );
        let a = Player::new("A", Role::Player);
        let b = Player::new("B", Role::Player);
        let c = Player::new("C", Role::Player);
        let group = EventGroup {
            id: Uuid::new_v4(),
            event_id: event.id,
            group_number: 1,
            start_time: None,
            members: vec![
                GroupMember {
                    player_id: b.id,
                    position: 2,
                },
                GroupMember {
                    player_id: a.id,
                    position: 1,
                },
            ],
        };
        let a_id = a.id;
        let c_id = c.id;
        let detail = EventDetail {
            event,
            course,
            participants: vec![a, b, c],
            groups: vec![group],
            scores: vec![],
        };
        (detail, a_id, c_id)
    }

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(
            "in_progress".parse::<EventStatus>().unwrap(),
            EventStatus::InProgress
        );
        assert_eq!(EventStatus::Completed.to_string(), "completed");
        assert!("cancelled".parse::<EventStatus>().is_err());
    }

    #[test]
    fn test_new_event_defaults() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        let event = Event::new("February Meet", date, Uuid::new_v4(), EventType::Monthly);
        assert_eq!(event.status, EventStatus::Upcoming);
        assert!(!event.is_finalized);
    }

    #[test]
    fn test_scoring_members_within_group() {
        let (detail, a_id, _) = detail_with_groups();
        let members = scoring_members(&detail, a_id);
        // Only the two grouped players, in tee-off order.
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "A");
        assert_eq!(members[1].name, "B");
    }

    #[test]
    fn test_scoring_members_falls_back_to_all_participants() {
        let (detail, _, c_id) = detail_with_groups();
        let members = scoring_members(&detail, c_id);
        assert_eq!(members.len(), 3);
    }
}
