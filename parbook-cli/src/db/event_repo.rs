use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use parbook_core::models::{Course, Event, EventDetail, EventStatus, EventType, Hole, Player, Role};

/// Cache of events, courses, and rosters pulled from the server, so
/// the scorecard still renders at a course without signal.
pub struct EventRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    name: String,
    event_date: String,
    course_id: String,
    status: String,
    event_type: String,
    is_finalized: bool,
}

#[derive(sqlx::FromRow)]
struct HoleRow {
    hole_number: i64,
    par: i64,
}

#[derive(sqlx::FromRow)]
struct PlayerRow {
    id: String,
    name: String,
    role: String,
    birth_year: Option<i64>,
    gender: Option<String>,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_course(&self, course: &Course) -> Result<(), sqlx::Error> {
        let id = course.id.to_string();

        sqlx::query(
            r#"
            INSERT INTO courses (id, name) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(&id)
        .bind(&course.name)
        .execute(&self.pool)
        .await?;

        for hole in &course.holes {
            sqlx::query(
                r#"
                INSERT INTO holes (course_id, hole_number, par) VALUES (?, ?, ?)
                ON CONFLICT(course_id, hole_number) DO UPDATE SET par = excluded.par
                "#,
            )
            .bind(&id)
            .bind(hole.hole_number as i64)
            .bind(hole.par as i64)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn upsert_event(&self, event: &Event) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, event_date, course_id, status, event_type, is_finalized)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                event_date = excluded.event_date,
                course_id = excluded.course_id,
                status = excluded.status,
                event_type = excluded.event_type,
                is_finalized = excluded.is_finalized
            "#,
        )
        .bind(event.id.to_string())
        .bind(&event.name)
        .bind(event.event_date.to_string())
        .bind(event.course_id.to_string())
        .bind(event.status.to_string())
        .bind(event.event_type.to_string())
        .bind(event.is_finalized)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_player(&self, player: &Player) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO players (id, name, role, birth_year, gender)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                birth_year = excluded.birth_year,
                gender = excluded.gender
            "#,
        )
        .bind(player.id.to_string())
        .bind(&player.name)
        .bind(player.role.to_string())
        .bind(player.birth_year.map(|y| y as i64))
        .bind(&player.gender)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_participant(
        &self,
        event_id: Uuid,
        player_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO event_players (event_id, player_id) VALUES (?, ?)")
            .bind(event_id.to_string())
            .bind(player_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Caches a full event detail pulled from the server.
    pub async fn cache_detail(&self, detail: &EventDetail) -> Result<(), sqlx::Error> {
        self.upsert_course(&detail.course).await?;
        self.upsert_event(&detail.event).await?;
        for player in &detail.participants {
            self.upsert_player(player).await?;
            self.add_participant(detail.event.id, player.id).await?;
        }
        Ok(())
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        let row: Option<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(hydrate_event))
    }

    pub async fn list_by_year(&self, year: i32) -> Result<Vec<Event>, sqlx::Error> {
        let rows: Vec<EventRow> =
            sqlx::query_as("SELECT * FROM events WHERE event_date LIKE ? ORDER BY event_date, id")
                .bind(format!("{:04}-%", year))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(hydrate_event).collect())
    }

    pub async fn get_course(&self, id: Uuid) -> Result<Option<Course>, sqlx::Error> {
        let id_str = id.to_string();

        let name: Option<(String,)> = sqlx::query_as("SELECT name FROM courses WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await?;
        let Some((name,)) = name else {
            return Ok(None);
        };

        let hole_rows: Vec<HoleRow> = sqlx::query_as(
            "SELECT hole_number, par FROM holes WHERE course_id = ? ORDER BY hole_number",
        )
        .bind(&id_str)
        .fetch_all(&self.pool)
        .await?;

        let holes: Vec<Hole> = hole_rows
            .into_iter()
            .map(|h| Hole {
                hole_number: h.hole_number as u8,
                par: h.par as u8,
            })
            .collect();

        // A partially cached course is as useless as a missing one.
        Ok(Course::from_holes(id, name, holes).ok())
    }

    pub async fn participants(&self, event_id: Uuid) -> Result<Vec<Player>, sqlx::Error> {
        let rows: Vec<PlayerRow> = sqlx::query_as(
            r#"
            SELECT p.* FROM players p
            INNER JOIN event_players ep ON p.id = ep.player_id
            WHERE ep.event_id = ?
            ORDER BY p.name, p.id
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(hydrate_player).collect())
    }
}

fn hydrate_event(row: EventRow) -> Event {
    Event {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        name: row.name,
        event_date: NaiveDate::parse_from_str(&row.event_date, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        course_id: Uuid::parse_str(&row.course_id).unwrap_or_default(),
        status: row.status.parse().unwrap_or(EventStatus::Upcoming),
        event_type: row.event_type.parse().unwrap_or(EventType::Monthly),
        is_finalized: row.is_finalized,
    }
}

fn hydrate_player(row: PlayerRow) -> Player {
    Player {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        name: row.name,
        role: row.role.parse().unwrap_or(Role::Player),
        birth_year: row.birth_year.map(|y| y as i32),
        gender: row.gender,
    }
}
