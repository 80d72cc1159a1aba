//! The capture session: wires the score buffer, sync queue, and
//! navigation state together into the commit-on-navigation workflow
//! used during live play.
//!
//! Adjustments touch only the local buffer. A cell is committed when
//! the scorer navigates away from it (player switch, hole switch) or
//! calls [`CaptureSession::commit_current`]. A commit is delivered
//! straight to the sink when online; otherwise it is queued and the
//! queue is flushed on the next offline-to-online transition.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::buffer::{HoleScore, ScoreBuffer, ScoreField};
use super::queue::SyncQueue;
use super::store::{DurableStore, StoreError};
use crate::models::{Course, PendingScoreMutation, Player, ScoreRecord, HOLE_COUNT};
use crate::sync::SyncError;

/// Delivery port for committed score mutations. Implementations are
/// expected to be idempotent per cell: re-delivering the same mutation
/// must leave the server record unchanged.
pub trait ScoreSink {
    fn upsert(&mut self, mutation: &PendingScoreMutation) -> Result<(), SyncError>;
}

impl<T: ScoreSink + ?Sized> ScoreSink for Box<T> {
    fn upsert(&mut self, mutation: &PendingScoreMutation) -> Result<(), SyncError> {
        (**self).upsert(mutation)
    }
}

/// Result of a queue flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushOutcome {
    /// Mutations acknowledged by the sink.
    pub delivered: usize,
    /// Mutations still queued after the flush.
    pub retained: usize,
}

/// One scorer's live session against one event.
pub struct CaptureSession<S: ScoreSink> {
    event_id: Uuid,
    course: Course,
    members: Vec<Player>,
    scorer: Uuid,
    buffer: ScoreBuffer,
    queue: SyncQueue,
    store: Arc<dyn DurableStore>,
    sink: S,
    online: bool,
    current_player: usize,
    current_hole: u8,
}

impl<S: ScoreSink> CaptureSession<S> {
    /// Opens a session, restoring the buffer, queue, and last
    /// navigation position persisted on this device.
    ///
    /// `members` is the scoring roster in display order and must not be
    /// empty.
    pub fn open(
        event_id: Uuid,
        course: Course,
        members: Vec<Player>,
        scorer: Uuid,
        store: Arc<dyn DurableStore>,
        sink: S,
        online: bool,
    ) -> Self {
        assert!(!members.is_empty(), "scoring roster must not be empty");
        let buffer = ScoreBuffer::open(event_id, store.clone());
        let queue = SyncQueue::open(event_id, store.clone());
        let (current_player, current_hole) = restore_position(&*store, event_id, &members);
        Self {
            event_id,
            course,
            members,
            scorer,
            buffer,
            queue,
            store,
            sink,
            online,
            current_player,
            current_hole,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn members(&self) -> &[Player] {
        &self.members
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn current_player(&self) -> &Player {
        &self.members[self.current_player]
    }

    pub fn current_hole(&self) -> u8 {
        self.current_hole
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Seeds the buffer from a server snapshot, with still-pending
    /// local mutations overlaid on top.
    pub fn seed(&mut self, snapshot: &[ScoreRecord]) -> Result<(), StoreError> {
        let pending = self.queue.snapshot();
        self.buffer.seed(snapshot, &pending)
    }

    /// Current value of the cell under the cursor.
    pub fn current_score(&self) -> HoleScore {
        self.buffer.get(self.current_player().id, self.current_hole)
    }

    /// Adjusts the cell under the cursor. Local only; nothing is sent
    /// until the scorer navigates away or commits explicitly.
    pub fn adjust(&mut self, field: ScoreField, delta: i32) -> Result<HoleScore, StoreError> {
        let player_id = self.current_player().id;
        self.buffer.adjust(player_id, self.current_hole, field, delta)
    }

    /// Commits the cell under the cursor: delivered directly when
    /// online, queued otherwise. Unset cells are skipped. Store errors
    /// surface; sink failures silently fall back to the queue.
    pub fn commit_current(&mut self) -> Result<(), StoreError> {
        let player_id = self.current_player().id;
        let score = self.buffer.get(player_id, self.current_hole);
        if !score.is_set() {
            return Ok(());
        }
        let mutation = PendingScoreMutation {
            event_id: self.event_id,
            player_id,
            hole_number: self.current_hole,
            strokes: score.strokes,
            putts: score.putts,
            updated_by: Some(self.scorer),
            queued_at: Utc::now(),
        };
        if self.online && self.sink.upsert(&mutation).is_ok() {
            // A stale queued mutation for this cell is now superseded.
            return self.queue.acknowledge(mutation.cell());
        }
        self.queue.enqueue(mutation)
    }

    /// Moves the cursor to another player in the roster, committing the
    /// cell being left first.
    pub fn select_player(&mut self, player_id: Uuid) -> Result<(), StoreError> {
        let Some(index) = self.members.iter().position(|p| p.id == player_id) else {
            return Ok(());
        };
        if index == self.current_player {
            return Ok(());
        }
        self.commit_current()?;
        self.current_player = index;
        self.persist_position()
    }

    /// Moves the cursor to another hole, committing the cell being
    /// left first. Out-of-range hole numbers are ignored.
    pub fn goto_hole(&mut self, hole_number: u8) -> Result<(), StoreError> {
        if hole_number < 1 || hole_number > HOLE_COUNT as u8 || hole_number == self.current_hole {
            return Ok(());
        }
        self.commit_current()?;
        self.current_hole = hole_number;
        self.persist_position()
    }

    pub fn next_hole(&mut self) -> Result<(), StoreError> {
        self.goto_hole(self.current_hole + 1)
    }

    pub fn prev_hole(&mut self) -> Result<(), StoreError> {
        self.goto_hole(self.current_hole.saturating_sub(1))
    }

    /// Updates connectivity. An offline-to-online edge triggers a
    /// queue flush; going offline just records the state.
    pub fn set_online(&mut self, online: bool) -> Result<FlushOutcome, StoreError> {
        let was_online = self.online;
        self.online = online;
        if online && !was_online {
            return self.flush_pending();
        }
        Ok(FlushOutcome {
            delivered: 0,
            retained: self.queue.len(),
        })
    }

    /// Drains the queue through the sink in (player, hole) order.
    /// Failed deliveries stay queued for the next trigger.
    pub fn flush_pending(&mut self) -> Result<FlushOutcome, StoreError> {
        let mut outcome = FlushOutcome::default();
        for mutation in self.queue.snapshot() {
            match self.sink.upsert(&mutation) {
                Ok(()) => {
                    self.queue.acknowledge(mutation.cell())?;
                    outcome.delivered += 1;
                }
                Err(_) => outcome.retained += 1,
            }
        }
        Ok(outcome)
    }

    /// Relative-to-par label for the cell under the cursor, once
    /// strokes have been entered.
    pub fn label(&self) -> Option<String> {
        let score = self.current_score();
        let par = self.course.par_for(self.current_hole)?;
        crate::models::par_diff_label(score.strokes, par)
    }

    fn persist_position(&self) -> Result<(), StoreError> {
        let position = StoredPosition {
            player_id: self.current_player().id,
            hole_number: self.current_hole,
        };
        let json = serde_json::to_string(&position).expect("position serialize");
        self.store.put(&position_key(self.event_id), &json)
    }
}

fn restore_position(
    store: &dyn DurableStore,
    event_id: Uuid,
    members: &[Player],
) -> (usize, u8) {
    let stored = store
        .get(&position_key(event_id))
        .ok()
        .flatten()
        .and_then(|json| serde_json::from_str::<StoredPosition>(&json).ok());
    match stored {
        Some(p) if (1..=HOLE_COUNT as u8).contains(&p.hole_number) => {
            let index = members
                .iter()
                .position(|m| m.id == p.player_id)
                .unwrap_or(0);
            (index, p.hole_number)
        }
        _ => (0, 1),
    }
}

fn position_key(event_id: Uuid) -> String {
    format!("lastpos-{}", event_id)
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredPosition {
    player_id: Uuid,
    hole_number: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::store::MemoryStore;
    use crate::models::{demo_pars, Role};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Sink that records deliveries and can be told to fail.
    #[derive(Default)]
    struct RecordingSink {
        delivered: Arc<Mutex<HashMap<(Uuid, u8), PendingScoreMutation>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl RecordingSink {
        fn new() -> (Self, Arc<Mutex<HashMap<(Uuid, u8), PendingScoreMutation>>>, Arc<Mutex<bool>>)
        {
            let delivered = Arc::new(Mutex::new(HashMap::new()));
            let fail = Arc::new(Mutex::new(false));
            (
                Self {
                    delivered: delivered.clone(),
                    fail: fail.clone(),
                },
                delivered,
                fail,
            )
        }
    }

    impl ScoreSink for RecordingSink {
        fn upsert(&mut self, mutation: &PendingScoreMutation) -> Result<(), SyncError> {
            if *self.fail.lock().unwrap() {
                return Err(SyncError::ConnectionError("down".to_string()));
            }
            self.delivered
                .lock()
                .unwrap()
                .insert(mutation.cell(), mutation.clone());
            Ok(())
        }
    }

    fn players(n: usize) -> Vec<Player> {
        (0..n).map(|i| Player::new(format!("Player {}", i + 1), Role::Player)).collect()
    }

    fn session(
        members: Vec<Player>,
        store: Arc<MemoryStore>,
        online: bool,
    ) -> (
        CaptureSession<RecordingSink>,
        Arc<Mutex<HashMap<(Uuid, u8), PendingScoreMutation>>>,
        Arc<Mutex<bool>>,
    ) {
        let (sink, delivered, fail) = RecordingSink::new();
        let scorer = members[0].id;
        let session = CaptureSession::open(
            Uuid::new_v4(),
            Course::new("Demo".to_string(), demo_pars()).unwrap(),
            members,
            scorer,
            store,
            sink,
            online,
        );
        (session, delivered, fail)
    }

    #[test]
    fn test_adjust_is_local_only() {
        let (mut session, delivered, _) = session(players(2), Arc::new(MemoryStore::new()), true);
        session.adjust(ScoreField::Strokes, 4).unwrap();
        assert_eq!(session.current_score().strokes, 4);
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn test_navigation_commits_previous_cell() {
        let (mut session, delivered, _) = session(players(2), Arc::new(MemoryStore::new()), true);
        let player = session.current_player().id;
        session.adjust(ScoreField::Strokes, 5).unwrap();
        session.adjust(ScoreField::Putts, 2).unwrap();
        session.next_hole().unwrap();

        let delivered = delivered.lock().unwrap();
        let sent = delivered.get(&(player, 1)).unwrap();
        assert_eq!(sent.strokes, 5);
        assert_eq!(sent.putts, 2);
        assert_eq!(session.current_hole(), 2);
    }

    #[test]
    fn test_player_switch_commits_previous_cell() {
        let members = players(2);
        let second = members[1].id;
        let (mut session, delivered, _) = session(members, Arc::new(MemoryStore::new()), true);
        let first = session.current_player().id;
        session.adjust(ScoreField::Strokes, 4).unwrap();
        session.select_player(second).unwrap();

        assert!(delivered.lock().unwrap().contains_key(&(first, 1)));
        assert_eq!(session.current_player().id, second);
    }

    #[test]
    fn test_unset_cell_is_not_committed() {
        let (mut session, delivered, _) = session(players(1), Arc::new(MemoryStore::new()), true);
        session.next_hole().unwrap();
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_putts_only_cell_is_not_committed() {
        let (mut session, delivered, _) = session(players(1), Arc::new(MemoryStore::new()), true);
        session.adjust(ScoreField::Putts, 3).unwrap();
        session.next_hole().unwrap();
        session.commit_current().unwrap();
        // No strokes entered, so nothing may reach the sink or the
        // queue; a zero-stroke write is permanently undeliverable.
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_out_of_range_hole_navigation_has_no_effect() {
        let (mut session, delivered, _) = session(players(1), Arc::new(MemoryStore::new()), true);
        session.adjust(ScoreField::Strokes, 4).unwrap();
        session.goto_hole(25).unwrap();
        session.goto_hole(0).unwrap();
        // The cursor stays put and the cell being edited is not
        // committed by the stray navigation.
        assert_eq!(session.current_hole(), 1);
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_offline_commits_queue_instead_of_sending() {
        let (mut session, delivered, _) = session(players(1), Arc::new(MemoryStore::new()), false);
        session.adjust(ScoreField::Strokes, 4).unwrap();
        session.next_hole().unwrap();
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(session.pending_count(), 1);
    }

    #[test]
    fn test_full_offline_round_flushes_on_reconnect() {
        let (mut session, delivered, _) = session(players(1), Arc::new(MemoryStore::new()), false);
        for hole in 1..=HOLE_COUNT as u8 {
            session.adjust(ScoreField::Strokes, 4).unwrap();
            session.adjust(ScoreField::Putts, 2).unwrap();
            if hole < HOLE_COUNT as u8 {
                session.next_hole().unwrap();
            }
        }
        session.commit_current().unwrap();
        assert_eq!(session.pending_count(), 18);

        let outcome = session.set_online(true).unwrap();
        assert_eq!(outcome.delivered, 18);
        assert_eq!(outcome.retained, 0);
        assert_eq!(delivered.lock().unwrap().len(), 18);
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_failed_flush_retains_entries() {
        let (mut session, delivered, fail) = session(players(1), Arc::new(MemoryStore::new()), false);
        session.adjust(ScoreField::Strokes, 4).unwrap();
        session.commit_current().unwrap();

        *fail.lock().unwrap() = true;
        let outcome = session.set_online(true).unwrap();
        assert_eq!(outcome.delivered, 0);
        assert_eq!(outcome.retained, 1);
        assert_eq!(session.pending_count(), 1);

        *fail.lock().unwrap() = false;
        let outcome = session.flush_pending().unwrap();
        assert_eq!(outcome.delivered, 1);
        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_sink_failure_while_online_falls_back_to_queue() {
        let (mut session, delivered, fail) = session(players(1), Arc::new(MemoryStore::new()), true);
        *fail.lock().unwrap() = true;
        session.adjust(ScoreField::Strokes, 4).unwrap();
        session.next_hole().unwrap();
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(session.pending_count(), 1);
        // Navigation still proceeds despite the failed delivery.
        assert_eq!(session.current_hole(), 2);
    }

    #[test]
    fn test_online_delivery_supersedes_queued_mutation() {
        let store = Arc::new(MemoryStore::new());
        let members = players(1);
        let (mut session, delivered, _) = session(members, store, false);
        session.adjust(ScoreField::Strokes, 4).unwrap();
        session.commit_current().unwrap();
        assert_eq!(session.pending_count(), 1);

        // Re-commit the corrected value once back online.
        session.online = true;
        session.adjust(ScoreField::Strokes, 1).unwrap();
        session.commit_current().unwrap();

        assert_eq!(session.pending_count(), 0);
        let delivered = delivered.lock().unwrap();
        let player = delivered.keys().next().unwrap().0;
        assert_eq!(delivered.get(&(player, 1)).unwrap().strokes, 5);
    }

    #[test]
    fn test_position_survives_reopen() {
        let store = Arc::new(MemoryStore::new());
        let members = players(2);
        let second = members[1].id;
        let event_id = {
            let (mut session, _, _) = session(members.clone(), store.clone(), true);
            session.goto_hole(7).unwrap();
            session.select_player(second).unwrap();
            session.event_id()
        };
        let (sink, _, _) = RecordingSink::new();
        let reopened = CaptureSession::open(
            event_id,
            Course::new("Demo".to_string(), demo_pars()).unwrap(),
            members,
            second,
            store,
            sink,
            true,
        );
        assert_eq!(reopened.current_hole(), 7);
        assert_eq!(reopened.current_player().id, second);
    }

    #[test]
    fn test_double_flush_is_idempotent() {
        let (mut session, delivered, _) = session(players(1), Arc::new(MemoryStore::new()), false);
        session.adjust(ScoreField::Strokes, 3).unwrap();
        session.commit_current().unwrap();

        session.set_online(true).unwrap();
        let second = session.flush_pending().unwrap();
        assert_eq!(second.delivered, 0);
        assert_eq!(second.retained, 0);
        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_label_tracks_par() {
        let (mut session, _, _) = session(players(1), Arc::new(MemoryStore::new()), true);
        assert_eq!(session.label(), None);
        session.adjust(ScoreField::Strokes, 3).unwrap();
        // Hole 1 is a par 4 on the demo course.
        assert_eq!(session.label().as_deref(), Some("birdie"));
    }
}
