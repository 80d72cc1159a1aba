//! Server-side score storage over SQLite.
//!
//! Scores are keyed by (event, player, hole); writing the same cell
//! again replaces it, which is what makes client retries and queue
//! flushes after reconnects safe to repeat.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use parbook_core::error::{validate_score_write, ValidationError};
use parbook_core::models::{
    demo_pars, Course, Event, EventDetail, EventGroup, EventStatus, EventType, GroupMember, Hole,
    Player, Role, ScoreRecord, SeasonStat,
};
use parbook_core::ranking::SeasonStanding;
use parbook_core::sync::ScoreUpsert;

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// Database error.
    DbError(sqlx::Error),
    /// The write failed domain validation.
    Invalid(ValidationError),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::DbError(e) => write!(f, "Database error: {}", e),
            ServerStorageError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::DbError(e) => Some(e),
            ServerStorageError::Invalid(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for ServerStorageError {
    fn from(e: sqlx::Error) -> Self {
        ServerStorageError::DbError(e)
    }
}

impl From<ValidationError> for ServerStorageError {
    fn from(e: ValidationError) -> Self {
        ServerStorageError::Invalid(e)
    }
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    event_id: String,
    player_id: String,
    hole_number: i64,
    strokes: i64,
    putts: i64,
    updated_by: Option<String>,
    updated_at: String,
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
struct PlayerRow {
    id: String,
    name: String,
    role: String,
    birth_year: Option<i64>,
    gender: Option<String>,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: String,
    event_id: String,
    group_number: i64,
    start_time: Option<String>,
}

#[derive(sqlx::FromRow)]
struct GroupMemberRow {
    player_id: String,
    position: i64,
}

#[derive(sqlx::FromRow)]
struct SeasonStatRow {
    player_id: String,
    year: i64,
    total_points: i64,
    participation_count: i64,
    initial_handicap: i64,
    current_handicap: i64,
}

const DEMO_COURSE_NAME: &str = "Riverside Golf Club";

/// Server-side storage for society data.
#[derive(Debug, Clone)]
pub struct ServerStorage {
    pool: SqlitePool,
}

impl ServerStorage {
    /// Opens the database, creating it and running migrations if needed.
    pub async fn open(db_path: PathBuf) -> Result<Self, ServerStorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(ServerStorageError::DbError)?
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ServerStorageError::DbError(sqlx::Error::Migrate(Box::new(e))))?;

        Ok(Self { pool })
    }

    // ------------------------------------------------------------------
    // Scores
    // ------------------------------------------------------------------

    /// Upserts one scorecard cell. Validates the write, requires the
    /// event and player to exist, and stamps `updated_at` server-side.
    pub async fn upsert_score(
        &self,
        upsert: &ScoreUpsert,
    ) -> Result<ScoreRecord, ServerStorageError> {
        validate_score_write(upsert.hole_number, upsert.strokes)?;

        if self.event(upsert.event_id).await?.is_none() {
            return Err(ValidationError::UnknownEvent(upsert.event_id).into());
        }
        if self.player(upsert.player_id).await?.is_none() {
            return Err(ValidationError::UnknownPlayer(upsert.player_id).into());
        }

        let updated_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO scores (event_id, player_id, hole_number, strokes, putts, updated_by, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_id, player_id, hole_number) DO UPDATE SET
                strokes = excluded.strokes,
                putts = excluded.putts,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(upsert.event_id.to_string())
        .bind(upsert.player_id.to_string())
        .bind(upsert.hole_number as i64)
        .bind(upsert.strokes as i64)
        .bind(upsert.putts as i64)
        .bind(upsert.updated_by.map(|u| u.to_string()))
        .bind(updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ScoreRecord {
            event_id: upsert.event_id,
            player_id: upsert.player_id,
            hole_number: upsert.hole_number,
            strokes: upsert.strokes,
            putts: upsert.putts,
            updated_by: upsert.updated_by,
            updated_at,
        })
    }

    /// All scores for an event, in (player, hole) order.
    pub async fn scores_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<ScoreRecord>, ServerStorageError> {
        let rows: Vec<ScoreRow> = sqlx::query_as(
            "SELECT * FROM scores WHERE event_id = ? ORDER BY player_id, hole_number",
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(hydrate_score).collect())
    }

    async fn scores_for_events(
        &self,
        event_ids: &[Uuid],
    ) -> Result<Vec<ScoreRecord>, ServerStorageError> {
        let mut all = Vec::new();
        for &event_id in event_ids {
            all.extend(self.scores_for_event(event_id).await?);
        }
        Ok(all)
    }

    // ------------------------------------------------------------------
    // Events and courses
    // ------------------------------------------------------------------

    pub async fn event(&self, id: Uuid) -> Result<Option<Event>, ServerStorageError> {
        let row: Option<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(hydrate_event))
    }

    pub async fn events_by_year(&self, year: i32) -> Result<Vec<Event>, ServerStorageError> {
        let rows: Vec<EventRow> =
            sqlx::query_as("SELECT * FROM events WHERE event_date LIKE ? ORDER BY event_date, id")
                .bind(format!("{:04}-%", year))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(hydrate_event).collect())
    }

    pub async fn course(&self, id: Uuid) -> Result<Option<Course>, ServerStorageError> {
        let id_str = id.to_string();
        let name: Option<(String,)> = sqlx::query_as("SELECT name FROM courses WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await?;
        let Some((name,)) = name else {
            return Ok(None);
        };

        let holes: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT hole_number, par FROM holes WHERE course_id = ? ORDER BY hole_number",
        )
        .bind(&id_str)
        .fetch_all(&self.pool)
        .await?;

        let holes: Vec<Hole> = holes
            .into_iter()
            .map(|(n, p)| Hole {
                hole_number: n as u8,
                par: p as u8,
            })
            .collect();
        Ok(Course::from_holes(id, name, holes).ok())
    }

    pub async fn player(&self, id: Uuid) -> Result<Option<Player>, ServerStorageError> {
        let row: Option<PlayerRow> = sqlx::query_as("SELECT * FROM players WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(hydrate_player))
    }

    pub async fn participants(&self, event_id: Uuid) -> Result<Vec<Player>, ServerStorageError> {
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

    pub async fn groups(&self, event_id: Uuid) -> Result<Vec<EventGroup>, ServerStorageError> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            "SELECT * FROM event_groups WHERE event_id = ? ORDER BY group_number",
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let member_rows: Vec<GroupMemberRow> = sqlx::query_as(
                "SELECT player_id, position FROM group_members WHERE group_id = ? ORDER BY position",
            )
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

            groups.push(EventGroup {
                id: Uuid::parse_str(&row.id).unwrap_or_default(),
                event_id: Uuid::parse_str(&row.event_id).unwrap_or_default(),
                group_number: row.group_number as u32,
                start_time: row
                    .start_time
                    .as_deref()
                    .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M:%S").ok()),
                members: member_rows
                    .into_iter()
                    .map(|m| GroupMember {
                        player_id: Uuid::parse_str(&m.player_id).unwrap_or_default(),
                        position: m.position as u32,
                    })
                    .collect(),
            });
        }
        Ok(groups)
    }

    /// Full event payload for the capture client.
    pub async fn event_detail(
        &self,
        event_id: Uuid,
    ) -> Result<Option<EventDetail>, ServerStorageError> {
        let Some(event) = self.event(event_id).await? else {
            return Ok(None);
        };
        let Some(course) = self.course(event.course_id).await? else {
            return Ok(None);
        };
        Ok(Some(EventDetail {
            participants: self.participants(event_id).await?,
            groups: self.groups(event_id).await?,
            scores: self.scores_for_event(event_id).await?,
            event,
            course,
        }))
    }

    // ------------------------------------------------------------------
    // Season and ranking inputs
    // ------------------------------------------------------------------

    /// Everything the season aggregator needs for one year.
    pub async fn season_inputs(
        &self,
        year: i32,
    ) -> Result<(Vec<(Event, Course)>, Vec<ScoreRecord>, Vec<Player>), ServerStorageError> {
        let events = self.events_by_year(year).await?;

        let mut pairs = Vec::with_capacity(events.len());
        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            let Some(course) = self.course(event.course_id).await? else {
                continue;
            };
            ids.push(event.id);
            pairs.push((event, course));
        }

        let scores = self.scores_for_events(&ids).await?;
        let players = self.all_players().await?;
        Ok((pairs, scores, players))
    }

    pub async fn all_players(&self) -> Result<Vec<Player>, ServerStorageError> {
        let rows: Vec<PlayerRow> = sqlx::query_as("SELECT * FROM players ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(hydrate_player).collect())
    }

    /// Ranking inputs: season stats joined with their players.
    pub async fn standings(&self, year: i32) -> Result<Vec<SeasonStanding>, ServerStorageError> {
        let rows: Vec<SeasonStatRow> = sqlx::query_as("SELECT * FROM season_stats WHERE year = ?")
            .bind(year as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut standings = Vec::with_capacity(rows.len());
        for row in rows {
            let stat = hydrate_season_stat(row);
            let Some(player) = self.player(stat.player_id).await? else {
                continue;
            };
            standings.push(SeasonStanding::from_stat(&stat, &player));
        }
        Ok(standings)
    }

    // ------------------------------------------------------------------
    // Writes used by seeding (and tests)
    // ------------------------------------------------------------------

    pub async fn insert_player(&self, player: &Player) -> Result<(), ServerStorageError> {
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

    pub async fn insert_course(&self, course: &Course) -> Result<(), ServerStorageError> {
        let id = course.id.to_string();
        sqlx::query("INSERT OR REPLACE INTO courses (id, name) VALUES (?, ?)")
            .bind(&id)
            .bind(&course.name)
            .execute(&self.pool)
            .await?;
        for hole in &course.holes {
            sqlx::query(
                "INSERT OR REPLACE INTO holes (course_id, hole_number, par) VALUES (?, ?, ?)",
            )
            .bind(&id)
            .bind(hole.hole_number as i64)
            .bind(hole.par as i64)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn insert_event(&self, event: &Event) -> Result<(), ServerStorageError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO events (id, name, event_date, course_id, status, event_type, is_finalized)
            VALUES (?, ?, ?, ?, ?, ?, ?)
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

    pub async fn add_participant(
        &self,
        event_id: Uuid,
        player_id: Uuid,
    ) -> Result<(), ServerStorageError> {
        sqlx::query("INSERT OR IGNORE INTO event_players (event_id, player_id) VALUES (?, ?)")
            .bind(event_id.to_string())
            .bind(player_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_group(&self, group: &EventGroup) -> Result<(), ServerStorageError> {
        sqlx::query(
            "INSERT OR REPLACE INTO event_groups (id, event_id, group_number, start_time) VALUES (?, ?, ?, ?)",
        )
        .bind(group.id.to_string())
        .bind(group.event_id.to_string())
        .bind(group.group_number as i64)
        .bind(group.start_time.map(|t| t.format("%H:%M:%S").to_string()))
        .execute(&self.pool)
        .await?;
        for member in &group.members {
            sqlx::query(
                "INSERT OR REPLACE INTO group_members (group_id, player_id, position) VALUES (?, ?, ?)",
            )
            .bind(group.id.to_string())
            .bind(member.player_id.to_string())
            .bind(member.position as i64)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn insert_season_stat(&self, stat: &SeasonStat) -> Result<(), ServerStorageError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO season_stats
                (player_id, year, total_points, participation_count, initial_handicap, current_handicap)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stat.player_id.to_string())
        .bind(stat.year as i64)
        .bind(stat.total_points)
        .bind(stat.participation_count as i64)
        .bind(stat.initial_handicap as i64)
        .bind(stat.current_handicap as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Seeds a demo society: one course, four players, two events, and
    /// season stats. A second run finds the demo course and does
    /// nothing, so repeated `--seed` starts are safe.
    pub async fn seed_demo(&self) -> Result<(), ServerStorageError> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM courses WHERE name = ?")
            .bind(DEMO_COURSE_NAME)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            tracing::info!("Demo data already present, skipping seed");
            return Ok(());
        }

        let course = Course::new(DEMO_COURSE_NAME, demo_pars())?;
        self.insert_course(&course).await?;

        let players = vec![
            Player::new("Taro Sato", Role::Admin).with_birth_year(1958),
            Player::new("Hanako Suzuki", Role::Player).with_birth_year(1963),
            Player::new("Jiro Tanaka", Role::Player).with_birth_year(1971),
            Player::new("Yuki Watanabe", Role::Player),
        ];
        for player in &players {
            self.insert_player(player).await?;
        }

        let year = Utc::now().year();
        let spring = Event::new(
            "Spring Monthly",
            NaiveDate::from_ymd_opt(year, 4, 12).unwrap_or_default(),
            course.id,
            EventType::Monthly,
        )
        .with_status(EventStatus::Completed);
        let autumn = Event::new(
            "Autumn Special",
            NaiveDate::from_ymd_opt(year, 10, 18).unwrap_or_default(),
            course.id,
            EventType::Special,
        );
        self.insert_event(&spring).await?;
        self.insert_event(&autumn).await?;

        for event in [&spring, &autumn] {
            for player in &players {
                self.add_participant(event.id, player.id).await?;
            }
        }

        self.insert_group(&EventGroup {
            id: Uuid::new_v4(),
            event_id: autumn.id,
            group_number: 1,
            start_time: NaiveTime::from_hms_opt(8, 30, 0),
            members: players
                .iter()
                .take(3)
                .enumerate()
                .map(|(i, p)| GroupMember {
                    player_id: p.id,
                    position: (i + 1) as u32,
                })
                .collect(),
        })
        .await?;

        for (i, player) in players.iter().enumerate() {
            self.insert_season_stat(&SeasonStat {
                player_id: player.id,
                year,
                total_points: (40 - 5 * i) as i64,
                participation_count: (4 - i) as u32,
                initial_handicap: (10 + 2 * i) as i32,
                current_handicap: (9 + 2 * i) as i32,
            })
            .await?;
        }

        tracing::info!("Seeded demo data for {}", year);
        Ok(())
    }
}

fn hydrate_score(row: ScoreRow) -> ScoreRecord {
    ScoreRecord {
        event_id: Uuid::parse_str(&row.event_id).unwrap_or_default(),
        player_id: Uuid::parse_str(&row.player_id).unwrap_or_default(),
        hole_number: row.hole_number as u8,
        strokes: row.strokes as u32,
        putts: row.putts as u32,
        updated_by: row.updated_by.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
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

fn hydrate_season_stat(row: SeasonStatRow) -> SeasonStat {
    SeasonStat {
        player_id: Uuid::parse_str(&row.player_id).unwrap_or_default(),
        year: row.year as i32,
        total_points: row.total_points,
        participation_count: row.participation_count as u32,
        initial_handicap: row.initial_handicap as i32,
        current_handicap: row.current_handicap as i32,
    }
}
