//! The game service: inbound operations, persistence discipline, and
//! background progression.
//!
//! Every inbound operation follows the same shape: read the latest
//! persisted room, apply exactly one engine transition, persist, emit
//! the produced messages. Long-running work — surrogate decisions,
//! last-words waits, phase timers — runs as separately spawned tasks
//! keyed by (room id, generation); a stale task finds the generation
//! moved on and no-ops instead of mutating a future phase.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use moonhall_engine::night::{self, NightStep};
use moonhall_engine::{
    Audience, Clock, EngineError, GameConfig, Outbound, Phase, Role, Room, SystemClock, flow,
};
use moonhall_protocol::{Action, Event, ParticipantId, RoomId};
use moonhall_store::{RetryPolicy, RoomStore, StoreError, with_retries};
use moonhall_surrogate::{SurrogateActor, TextCompletion};

use crate::broadcast::Broadcaster;
use crate::error::MoonhallError;

/// Iteration cap for one background drive task. High enough for a full
/// 12-seat night plus a revenge chain, low enough to stop a confused
/// task from spinning.
const DRIVE_BUDGET: usize = 64;

/// Slack added to a phase's duration before the scheduled nudge fires,
/// so the opportunistic check sees the phase as genuinely expired.
const NUDGE_SLACK: Duration = Duration::from_secs(1);

/// Runs many independent werewolf sessions against a shared store.
pub struct GameService<S, B> {
    store: Arc<S>,
    broadcaster: Arc<B>,
    surrogate: Arc<SurrogateActor>,
    clock: Arc<dyn Clock>,
    config: GameConfig,
    retry: RetryPolicy,
}

impl<S, B> Clone for GameService<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            broadcaster: Arc::clone(&self.broadcaster),
            surrogate: Arc::clone(&self.surrogate),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            retry: self.retry,
        }
    }
}

impl<S, B> GameService<S, B>
where
    S: RoomStore + 'static,
    B: Broadcaster + 'static,
{
    pub fn new(
        store: S,
        broadcaster: B,
        completion: Arc<dyn TextCompletion>,
        config: GameConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            broadcaster: Arc::new(broadcaster),
            surrogate: Arc::new(SurrogateActor::new(completion)),
            clock: Arc::new(SystemClock),
            config: config.validated(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the wall clock. Tests drive time explicitly with this.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------
    // Inbound operations
    // -----------------------------------------------------------------

    /// Creates an empty waiting room and returns its id.
    pub async fn create_room(&self) -> Result<RoomId, MoonhallError> {
        let id = RoomId::generate();
        let room = Room::new(id.clone(), self.now());
        self.persist(&room).await?;
        tracing::info!(room_id = %id, "room created");
        Ok(id)
    }

    /// Seats a participant. Re-joining with a known id is a no-op.
    pub async fn join(
        &self,
        room_id: &RoomId,
        participant_id: ParticipantId,
        name: impl Into<String>,
        surrogate: bool,
    ) -> Result<(), MoonhallError> {
        let mut room = self.load(room_id).await?;
        let prev_gen = room.generation;
        let events = flow::join(
            &mut room,
            participant_id,
            name,
            surrogate,
            &self.config,
            self.now(),
        )?;
        self.persist(&room).await?;
        self.emit(room_id, &events).await;
        self.after_persist(&room, prev_gen).await;
        Ok(())
    }

    /// Deals roles and returns as soon as the reveal is persisted; the
    /// first night begins on a separately scheduled task.
    pub async fn start(&self, room_id: &RoomId) -> Result<(), MoonhallError> {
        let mut room = self.load(room_id).await?;
        let prev_gen = room.generation;
        let events = flow::start(&mut room, &self.config, &mut rand::rng(), self.now())?;
        self.persist(&room).await?;
        self.emit(room_id, &events).await;
        self.after_persist(&room, prev_gen).await;
        Ok(())
    }

    /// Applies one participant action. Validation errors are reported
    /// with no mutation persisted; concurrency losers are absorbed.
    pub async fn submit_action(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        action: Action,
    ) -> Result<(), MoonhallError> {
        let mut room = self.load(room_id).await?;
        let prev_gen = room.generation;
        let events = match flow::apply_action(
            &mut room,
            participant_id,
            &action,
            &self.config,
            self.now(),
        ) {
            Ok(events) => events,
            Err(EngineError::Concurrency(reason)) => {
                tracing::debug!(room_id = %room_id, reason, "action lost a race, absorbing");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(
            room_id = %room_id,
            participant = %participant_id,
            action = action.name(),
            "action applied"
        );
        self.persist(&room).await?;
        self.emit(room_id, &events).await;

        // Night completion is not an inbound transition: hand it to a
        // scheduled task so the request path returns immediately.
        let night_ready =
            room.phase == Phase::Night && night::current_step(&room) == NightStep::Complete;
        self.after_persist(&room, prev_gen).await;
        if night_ready {
            self.spawn_drive(room.id.clone(), room.generation);
        }
        Ok(())
    }

    /// The latest room snapshot. Also runs the opportunistic timeout
    /// check, so polling is what keeps an all-human room moving.
    pub async fn poll(&self, room_id: &RoomId) -> Result<serde_json::Value, MoonhallError> {
        let room = self.check_timeout(room_id).await?;
        Ok(room.snapshot())
    }

    /// The public message log.
    pub async fn public_messages(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<moonhall_protocol::MessageRecord>, MoonhallError> {
        Ok(self.store.public_messages(room_id).await?)
    }

    /// One participant's private message log.
    pub async fn private_messages(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<Vec<moonhall_protocol::MessageRecord>, MoonhallError> {
        Ok(self
            .store
            .private_messages(room_id, participant_id)
            .await?)
    }

    // -----------------------------------------------------------------
    // Persistence discipline
    // -----------------------------------------------------------------

    async fn load(&self, room_id: &RoomId) -> Result<Room, MoonhallError> {
        let store = Arc::clone(&self.store);
        let doc = with_retries(self.retry, || {
            let store = Arc::clone(&store);
            let id = room_id.clone();
            async move { store.get_room(&id).await }
        })
        .await?;
        let doc = doc.ok_or_else(|| MoonhallError::RoomNotFound(room_id.clone()))?;
        let room = serde_json::from_value(doc).map_err(StoreError::from)?;
        Ok(room)
    }

    async fn persist(&self, room: &Room) -> Result<(), MoonhallError> {
        let doc = serde_json::to_value(room).map_err(StoreError::from)?;
        let store = Arc::clone(&self.store);
        let id = room.id.clone();
        with_retries(self.retry, || {
            let store = Arc::clone(&store);
            let id = id.clone();
            let doc = doc.clone();
            async move { store.put_room(&id, &doc).await }
        })
        .await?;
        Ok(())
    }

    /// Appends produced messages to their logs and pushes them out.
    /// Log appends are best-effort: a failed append is logged and play
    /// continues on the authoritative room document.
    async fn emit(&self, room_id: &RoomId, events: &[Outbound]) {
        for (audience, record) in events {
            match audience {
                Audience::Everyone => {
                    if let Err(err) = self.store.append_public(room_id, record).await {
                        tracing::warn!(room_id = %room_id, error = %err, "public log append failed");
                    }
                    self.broadcaster
                        .broadcast(
                            room_id,
                            Event::PublicMessage {
                                message: record.clone(),
                            },
                        )
                        .await;
                }
                Audience::One(participant) => {
                    if let Err(err) = self.store.append_private(room_id, participant, record).await
                    {
                        tracing::warn!(room_id = %room_id, error = %err, "private log append failed");
                    }
                    self.broadcaster
                        .deliver(
                            room_id,
                            participant,
                            Event::PrivateMessage {
                                message: record.clone(),
                            },
                        )
                        .await;
                }
            }
        }
    }

    /// After every persisted mutation: push the fresh snapshot, and if
    /// the phase changed, schedule the new phase's timer nudge and its
    /// surrogate drive.
    async fn after_persist(&self, room: &Room, prev_gen: u64) {
        self.broadcaster
            .broadcast(
                &room.id,
                Event::RoomUpdate {
                    room: room.snapshot(),
                },
            )
            .await;

        if room.generation == prev_gen {
            return;
        }
        if let Some(duration) = self.config.phase_duration(room.phase) {
            self.spawn_nudge(room.id.clone(), room.generation, duration + NUDGE_SLACK);
        }
        self.spawn_drive(room.id.clone(), room.generation);
    }

    // -----------------------------------------------------------------
    // Timeout dispatch
    // -----------------------------------------------------------------

    /// Re-reads the latest room and, if its phase has expired, applies
    /// exactly the transition the current phase calls for. Idempotent:
    /// concurrent invocations race on the persisted phase and the
    /// losers' transitions are rejected inside the engine.
    async fn check_timeout(&self, room_id: &RoomId) -> Result<Room, MoonhallError> {
        let mut room = self.load(room_id).await?;
        let prev_gen = room.generation;
        let events =
            match flow::on_timeout(&mut room, &self.config, &mut rand::rng(), self.now()) {
                Ok(events) => events,
                Err(EngineError::Concurrency(reason)) => {
                    tracing::debug!(room_id = %room_id, reason, "timeout check lost a race");
                    return Ok(room);
                }
                Err(err) => return Err(err.into()),
            };
        if room.generation != prev_gen {
            self.persist(&room).await?;
            self.emit(room_id, &events).await;
            self.after_persist(&room, prev_gen).await;
        }
        Ok(room)
    }

    fn spawn_nudge(&self, room_id: RoomId, generation: u64, delay: Duration) {
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match service.load(&room_id).await {
                Ok(room) if room.generation != generation => {
                    tracing::debug!(room_id = %room_id, "nudge is stale, yielding");
                }
                Ok(_) => {
                    if let Err(err) = service.check_timeout(&room_id).await {
                        tracing::debug!(room_id = %room_id, error = %err, "nudge check failed");
                    }
                }
                Err(err) => {
                    tracing::debug!(room_id = %room_id, error = %err, "nudge load failed");
                }
            }
        });
    }

    // -----------------------------------------------------------------
    // Surrogate drives
    // -----------------------------------------------------------------

    fn spawn_drive(&self, room_id: RoomId, generation: u64) {
        let service = self.clone();
        tokio::spawn(async move {
            service.drive(room_id, generation).await;
        });
    }

    /// Performs the surrogate work the current phase is waiting on, one
    /// unit at a time, re-reading the room before every mutation. The
    /// task retires as soon as the generation moves on — whatever comes
    /// next was scheduled by whoever moved it.
    async fn drive(&self, room_id: RoomId, generation: u64) {
        for _ in 0..DRIVE_BUDGET {
            let room = match self.load(&room_id).await {
                Ok(room) => room,
                Err(err) => {
                    tracing::debug!(room_id = %room_id, error = %err, "drive load failed");
                    return;
                }
            };
            if room.generation != generation {
                tracing::debug!(room_id = %room_id, "drive is stale, yielding");
                return;
            }

            if room.phase == Phase::Day {
                self.drive_day_speeches(&room, generation).await;
                return;
            }

            let Some(work) = self.next_work(&room).await else {
                return;
            };
            match work {
                Work::Act(actor, action) => {
                    if self.apply_surrogate_action(&room_id, generation, &actor, &action).await
                        == Applied::PhaseMoved
                    {
                        return;
                    }
                }
                Work::ResolveNight => {
                    self.resolve_night_now(&room_id, generation).await;
                    return;
                }
            }
        }
        tracing::warn!(room_id = %room_id, "drive budget exhausted");
    }

    /// One pass of day speeches, one per living surrogate.
    async fn drive_day_speeches(&self, room: &Room, generation: u64) {
        let speakers: Vec<ParticipantId> = room
            .living()
            .filter(|p| p.surrogate)
            .map(|p| p.id.clone())
            .collect();
        for speaker in speakers {
            let content = self.surrogate.speech(room, &speaker).await;
            let action = Action::Speech { content };
            if self
                .apply_surrogate_action(&room.id, generation, &speaker, &action)
                .await
                == Applied::PhaseMoved
            {
                return;
            }
        }
    }

    /// Re-reads, re-checks the generation, and applies one surrogate
    /// action. Rejected actions are logged and dropped — the next drive
    /// iteration recomputes from fresh state.
    async fn apply_surrogate_action(
        &self,
        room_id: &RoomId,
        generation: u64,
        actor: &ParticipantId,
        action: &Action,
    ) -> Applied {
        let mut room = match self.load(room_id).await {
            Ok(room) => room,
            Err(_) => return Applied::PhaseMoved,
        };
        if room.generation != generation {
            return Applied::PhaseMoved;
        }
        let prev_gen = room.generation;
        match flow::apply_action(&mut room, actor, action, &self.config, self.now()) {
            Ok(events) => {
                if self.persist(&room).await.is_err() {
                    return Applied::PhaseMoved;
                }
                self.emit(room_id, &events).await;
                self.after_persist(&room, prev_gen).await;
                if room.generation != prev_gen {
                    Applied::PhaseMoved
                } else {
                    Applied::Stayed
                }
            }
            Err(err) => {
                tracing::debug!(
                    room_id = %room_id,
                    participant = %actor,
                    action = action.name(),
                    error = %err,
                    "surrogate action rejected"
                );
                Applied::Stayed
            }
        }
    }

    /// The night's record is complete: convert it. Duplicate attempts
    /// die quietly inside the engine.
    async fn resolve_night_now(&self, room_id: &RoomId, generation: u64) {
        let mut room = match self.load(room_id).await {
            Ok(room) => room,
            Err(_) => return,
        };
        if room.generation != generation {
            return;
        }
        let prev_gen = room.generation;
        match flow::resolve_night(&mut room, &self.config, self.now()) {
            Ok(events) => {
                if self.persist(&room).await.is_ok() {
                    self.emit(room_id, &events).await;
                    self.after_persist(&room, prev_gen).await;
                }
            }
            Err(EngineError::Concurrency(reason)) => {
                tracing::debug!(room_id = %room_id, reason, "night resolution lost a race");
            }
            Err(err) => {
                tracing::warn!(room_id = %room_id, error = %err, "night resolution failed");
            }
        }
    }

    /// What the current phase is waiting on from a surrogate, if
    /// anything. Humans are waited out (the phase timer substitutes
    /// defaults); surrogates always choose.
    async fn next_work(&self, room: &Room) -> Option<Work> {
        match room.phase {
            Phase::Night => {
                let step = night::current_step(room);
                if step == NightStep::Complete {
                    return Some(Work::ResolveNight);
                }
                self.surrogate_night_action(room, step).await
            }
            Phase::Voting => {
                let voter = room
                    .living()
                    .find(|p| p.surrogate && !room.ballots.contains_key(&p.id))?
                    .id
                    .clone();
                let target = self.surrogate.vote_target(room, &voter).await?;
                Some(Work::Act(voter, Action::Vote { target }))
            }
            Phase::Resolution => self.surrogate_resolution_action(room).await,
            _ => None,
        }
    }

    async fn surrogate_night_action(&self, room: &Room, step: NightStep) -> Option<Work> {
        let record = room.night.as_ref()?;
        match step {
            NightStep::Guardian => {
                if record.guard_target.is_some() {
                    return None;
                }
                let actor = room
                    .living_with_role(Role::Guardian)
                    .find(|p| p.surrogate)?
                    .id
                    .clone();
                let target = self.surrogate.guard_target(room, &actor).await?;
                Some(Work::Act(actor, Action::Guard { target }))
            }
            NightStep::Wolves => {
                let actor = room
                    .living_with_role(Role::Wolf)
                    .find(|p| {
                        p.surrogate && !record.wolf_votes.iter().any(|v| v.voter == p.id)
                    })?
                    .id
                    .clone();
                let target = self.surrogate.wolf_target(room, &actor).await?;
                Some(Work::Act(actor, Action::WolfVote { target }))
            }
            NightStep::Seer => {
                if record.seer_target.is_some() {
                    return None;
                }
                let actor = room
                    .living_with_role(Role::Seer)
                    .find(|p| p.surrogate)?
                    .id
                    .clone();
                let target = self.surrogate.inspect_target(room, &actor).await?;
                Some(Work::Act(actor, Action::Inspect { target }))
            }
            NightStep::Witch => {
                if record.witch.is_some() {
                    return None;
                }
                let actor = room
                    .living_with_role(Role::Witch)
                    .find(|p| p.surrogate)?
                    .id
                    .clone();
                let choice = self.surrogate.witch_choice(room, &actor).await;
                Some(Work::Act(actor, Action::Witch { choice }))
            }
            NightStep::Complete => None,
        }
    }

    async fn surrogate_resolution_action(&self, room: &Room) -> Option<Work> {
        let state = room.resolution.as_ref()?;
        if let Some(shooter) = &state.pending_revenge {
            // A human hunter is waited out; a surrogate always chooses.
            if !room.participant(shooter).is_some_and(|p| p.surrogate) {
                return None;
            }
            let target = self.surrogate.revenge_target(room, shooter).await?;
            return Some(Work::Act(shooter.clone(), Action::Revenge { target }));
        }
        let speaker = state
            .last_words
            .iter()
            .find(|id| room.participant(id).is_some_and(|p| p.surrogate))?
            .clone();
        let content = self.surrogate.last_words(room, &speaker).await;
        Some(Work::Act(speaker, Action::LastWords { content }))
    }
}

/// One unit of background work.
enum Work {
    Act(ParticipantId, Action),
    ResolveNight,
}

/// Whether a surrogate action left the phase in place or moved it.
#[derive(Debug, PartialEq, Eq)]
enum Applied {
    Stayed,
    PhaseMoved,
}
