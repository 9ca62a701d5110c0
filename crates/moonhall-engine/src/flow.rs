//! Phase transitions.
//!
//! Every function here is one transition over a [`Room`]: validate,
//! mutate, and return the messages produced as `(Audience, record)`
//! pairs. Callers persist the room and deliver the messages; nothing in
//! this module performs IO.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;

use moonhall_protocol::{Action, MessageKind, MessageRecord, ParticipantId};

use crate::config::GameConfig;
use crate::error::EngineError;
use crate::night::{self, NightRecord, NightStep};
use crate::role::{self, Role};
use crate::room::{DeathCause, Participant, Phase, ResolutionKind, Room, Winner};
use crate::{chain, clock, vote};

/// Who receives a produced message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Append to the public log and broadcast.
    Everyone,
    /// Append to one participant's private log and deliver.
    One(ParticipantId),
}

/// One produced message and its audience.
pub type Outbound = (Audience, MessageRecord);

fn host(kind: MessageKind, content: impl Into<String>, now: DateTime<Utc>) -> MessageRecord {
    MessageRecord {
        kind,
        speaker: None,
        speaker_name: None,
        content: content.into(),
        timestamp: now,
    }
}

fn announce(out: &mut Vec<Outbound>, content: impl Into<String>, now: DateTime<Utc>) {
    out.push((Audience::Everyone, MessageRecord::system(content, now)));
}

// ---------------------------------------------------------------------------
// Joining and starting
// ---------------------------------------------------------------------------

/// Adds a participant to a waiting room. Re-joining with a known id is
/// a no-op so a reconnecting client cannot double-seat itself.
pub fn join(
    room: &mut Room,
    id: ParticipantId,
    name: impl Into<String>,
    surrogate: bool,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if room.phase != Phase::Waiting {
        return Err(EngineError::validation("the game has already started"));
    }
    if room.participant(&id).is_some() {
        return Ok(Vec::new());
    }
    if room.participants.len() >= config.max_players {
        return Err(EngineError::validation("the room is full"));
    }

    let name = name.into();
    room.participants
        .push(Participant::new(id, name.clone(), surrogate));
    tracing::info!(
        room_id = %room.id,
        seats = room.participants.len(),
        "participant joined"
    );

    let mut out = Vec::new();
    announce(
        &mut out,
        format!("{name} joined ({} seated).", room.participants.len()),
        now,
    );
    Ok(out)
}

/// Deals roles and enters RoleReveal. The first night begins when the
/// reveal timer runs out.
pub fn start(
    room: &mut Room,
    config: &GameConfig,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if room.phase != Phase::Waiting {
        return Err(EngineError::validation("the game has already started"));
    }
    let count = room.participants.len();
    if count < config.min_players {
        return Err(EngineError::Configuration(format!(
            "need at least {} participants to start, have {count}",
            config.min_players
        )));
    }

    let roles = role::assign_roles(count, rng)?;
    for (participant, role) in room.participants.iter_mut().zip(roles) {
        participant.role = Some(role);
    }
    room.set_phase(Phase::RoleReveal, now, config.role_reveal.as_secs());
    tracing::info!(room_id = %room.id, participants = count, "game started");

    let mut out = Vec::new();
    announce(
        &mut out,
        "Roles have been dealt. Check your identity — night falls shortly.",
        now,
    );

    let wolf_names: Vec<String> = room
        .participants
        .iter()
        .filter(|p| p.role == Some(Role::Wolf))
        .map(|p| p.name.clone())
        .collect();
    for p in &room.participants {
        let role = p.role.expect("assigned above");
        let mut text = format!("You are the {}.", role.display_name());
        if role == Role::Wolf {
            let packmates: Vec<&String> =
                wolf_names.iter().filter(|n| **n != p.name).collect();
            if packmates.is_empty() {
                text.push_str(" You hunt alone.");
            } else {
                let list = packmates
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                text.push_str(&format!(" Your packmates: {list}."));
            }
        }
        out.push((
            Audience::One(p.id.clone()),
            host(MessageKind::Identity, text, now),
        ));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Night
// ---------------------------------------------------------------------------

/// Opens a new night: fresh record, transient flags cleared, speaking
/// closed.
pub fn begin_night(
    room: &mut Room,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if !matches!(room.phase, Phase::RoleReveal | Phase::Resolution) {
        return Err(EngineError::Concurrency(format!(
            "cannot begin a night from {}",
            room.phase
        )));
    }

    room.night_count += 1;
    for p in &mut room.participants {
        p.guarded_tonight = false;
        p.checked_tonight = false;
    }
    room.night = Some(NightRecord::new());
    room.resolution = None;
    room.speaking_allowed = false;
    room.set_phase(Phase::Night, now, config.night.as_secs());
    let step = night::current_step(room);
    if let Some(record) = room.night.as_mut() {
        record.step = step;
    }

    let mut out = Vec::new();
    announce(
        &mut out,
        format!("Night {} falls. The village sleeps.", room.night_count),
        now,
    );
    out.extend(step_prompts(room, now));
    Ok(out)
}

/// Private prompts for whoever acts in the current sub-phase.
fn step_prompts(room: &Room, now: DateTime<Utc>) -> Vec<Outbound> {
    let mut out = Vec::new();
    let prompt = |out: &mut Vec<Outbound>, id: &ParticipantId, text: String| {
        out.push((Audience::One(id.clone()), host(MessageKind::Prompt, text, now)));
    };
    match night::current_step(room) {
        NightStep::Guardian => {
            for p in room.living_with_role(Role::Guardian) {
                prompt(&mut out, &p.id, "Choose someone to protect tonight.".into());
            }
        }
        NightStep::Wolves => {
            for p in room.living_with_role(Role::Wolf) {
                prompt(
                    &mut out,
                    &p.id,
                    "Wolves, choose tonight's prey. Every living wolf must vote.".into(),
                );
            }
        }
        NightStep::Seer => {
            for p in room.living_with_role(Role::Seer) {
                prompt(&mut out, &p.id, "Choose someone to inspect.".into());
            }
        }
        NightStep::Witch => {
            let victim = night::wolf_kill_target(room).map(|id| room.name_of(&id));
            for p in room.living_with_role(Role::Witch) {
                let text = match &victim {
                    Some(name) => format!(
                        "The wolves chose {name}. Use your antidote, your poison, or pass."
                    ),
                    None => "The wolves chose no one. Use your poison or pass.".into(),
                };
                prompt(&mut out, &p.id, text);
            }
        }
        NightStep::Complete => {}
    }
    out
}

/// Converts the night's record into deaths and enters Resolution.
///
/// Idempotent under re-triggering: a second attempt finds the phase
/// moved on (or the in-progress marker set) and gets `Concurrency`.
/// Missing actions are treated as abstentions, so a timed-out night
/// resolves with whatever was submitted.
pub fn resolve_night(
    room: &mut Room,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if room.phase != Phase::Night || room.resolving {
        return Err(EngineError::Concurrency(
            "night resolution already applied".into(),
        ));
    }
    room.resolving = true;

    let outcome = night::night_outcome(room);
    let mut applied = Vec::new();
    for (id, cause) in &outcome.deaths {
        if room.kill(id, *cause) {
            applied.push((id.clone(), *cause));
        }
    }

    // The no-repeat rule compares against the *previous* night, so the
    // guardian's memory updates only now that the night is over.
    let guard_target = room.night.as_ref().and_then(|r| r.guard_target.clone());
    for p in room
        .participants
        .iter_mut()
        .filter(|p| p.role == Some(Role::Guardian))
    {
        p.last_guard_target = guard_target.clone();
    }

    tracing::info!(
        room_id = %room.id,
        night = room.night_count,
        deaths = applied.len(),
        "night resolved"
    );

    let mut out = Vec::new();
    if applied.is_empty() {
        announce(&mut out, "Dawn breaks. The night was quiet — no one died.", now);
    } else {
        announce(&mut out, "Dawn breaks.", now);
        for (id, _) in &applied {
            announce(
                &mut out,
                format!("{} did not survive the night.", room.name_of(id)),
                now,
            );
        }
    }

    chain::arm(room, ResolutionKind::NightOutcome, &applied);
    room.set_phase(Phase::Resolution, now, config.resolution_grace.as_secs());
    out.extend(chain_prompts(room, now));

    if chain::is_complete(room) {
        out.extend(finish_resolution(room, config, now)?);
    }
    Ok(out)
}

/// Private prompts for a pending revenge shot and owed last words.
fn chain_prompts(room: &Room, now: DateTime<Utc>) -> Vec<Outbound> {
    let mut out = Vec::new();
    let Some(state) = room.resolution.as_ref() else {
        return out;
    };
    if let Some(shooter) = &state.pending_revenge {
        out.push((
            Audience::One(shooter.clone()),
            host(
                MessageKind::Prompt,
                "You were taken down. Choose someone to take with you.",
                now,
            ),
        ));
    }
    for speaker in &state.last_words {
        out.push((
            Audience::One(speaker.clone()),
            host(MessageKind::Prompt, "Any last words?", now),
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Day and voting
// ---------------------------------------------------------------------------

/// Closes discussion and opens the ballot box.
pub fn begin_voting(
    room: &mut Room,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if room.phase != Phase::Day {
        return Err(EngineError::Concurrency(format!(
            "cannot begin voting from {}",
            room.phase
        )));
    }
    room.ballots.clear();
    room.speaking_allowed = false;
    room.set_phase(Phase::Voting, now, config.voting.as_secs());

    let mut out = Vec::new();
    announce(
        &mut out,
        "Voting begins. Choose who to eliminate — the vote closes when time runs out.",
        now,
    );
    Ok(out)
}

/// Tallies the ballots and enters Resolution. A unique plurality target
/// is eliminated; a tie eliminates no one and the room heads into the
/// next night.
pub fn resolve_votes(
    room: &mut Room,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if room.phase != Phase::Voting || room.resolving {
        return Err(EngineError::Concurrency(
            "vote resolution already applied".into(),
        ));
    }
    room.resolving = true;

    let outcome = vote::tally(room);
    let mut out = Vec::new();
    let mut applied = Vec::new();
    match &outcome.eliminated {
        Some(id) => {
            if room.kill(id, DeathCause::Vote) {
                applied.push((id.clone(), DeathCause::Vote));
            }
            announce(
                &mut out,
                format!("The village has spoken. {} was voted out.", room.name_of(id)),
                now,
            );
        }
        None if outcome.top.len() >= 2 => {
            announce(&mut out, "The vote is tied. No one is eliminated.", now);
        }
        None => {
            announce(&mut out, "No ballots were cast. No one is eliminated.", now);
        }
    }

    tracing::info!(
        room_id = %room.id,
        day = room.day_count,
        eliminated = ?outcome.eliminated,
        "votes resolved"
    );

    chain::arm(room, ResolutionKind::VoteOutcome, &applied);
    room.set_phase(Phase::Resolution, now, config.resolution_grace.as_secs());
    out.extend(chain_prompts(room, now));

    if chain::is_complete(room) {
        out.extend(finish_resolution(room, config, now)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Resolution exit
// ---------------------------------------------------------------------------

/// Resumes normal progression once the ability chain has drained:
/// night resolutions open the next day, vote resolutions open the next
/// night, and a decided game ends on the spot.
pub fn finish_resolution(
    room: &mut Room,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if room.phase != Phase::Resolution {
        return Err(EngineError::Concurrency(format!(
            "nothing to finish in {}",
            room.phase
        )));
    }
    if !chain::is_complete(room) {
        return Err(EngineError::validation(
            "deaths are still being resolved",
        ));
    }
    let kind = room
        .resolution
        .as_ref()
        .map(|s| s.kind)
        .ok_or_else(|| EngineError::Concurrency("resolution already finished".into()))?;

    room.resolution = None;
    room.resolving = false;

    let mut out = Vec::new();
    if let Some(winner) = room.decided_winner() {
        room.winner = Some(winner);
        room.night = None;
        room.speaking_allowed = false;
        room.set_phase(Phase::Ended, now, 0);
        let text = match winner {
            Winner::Wolves => "The wolves have overrun the village. The wolves win.",
            Winner::Villagers => "The last wolf is dead. The village wins.",
        };
        announce(&mut out, text, now);
        tracing::info!(room_id = %room.id, ?winner, "game over");
        return Ok(out);
    }

    match kind {
        ResolutionKind::NightOutcome => {
            room.night = None;
            room.day_count += 1;
            room.speaking_allowed = true;
            room.set_phase(Phase::Day, now, config.day.as_secs());
            announce(
                &mut out,
                format!("Day {}. Discussion is open.", room.day_count),
                now,
            );
        }
        ResolutionKind::VoteOutcome => {
            out.extend(begin_night(room, config, now)?);
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Inbound actions
// ---------------------------------------------------------------------------

/// Applies one submitted action. Exhaustive over [`Action`]; each arm
/// validates against the current phase and applies at most one
/// transition.
pub fn apply_action(
    room: &mut Room,
    actor: &ParticipantId,
    action: &Action,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    let step_before = night::current_step(room);
    let mut out = Vec::new();

    match action {
        Action::Guard { target } => {
            night::record_guard(room, actor, target)?;
        }
        Action::WolfVote { target } => {
            night::record_wolf_vote(room, actor, target)?;
        }
        Action::Inspect { target } => {
            let wolf_aligned = night::record_inspect(room, actor, target)?;
            let alignment = if wolf_aligned {
                "wolf-aligned"
            } else {
                "villager-aligned"
            };
            out.push((
                Audience::One(actor.clone()),
                host(
                    MessageKind::SeerResult,
                    format!("{} is {alignment}.", room.name_of(target)),
                    now,
                ),
            ));
        }
        Action::Witch { choice } => {
            night::record_witch(room, actor, choice)?;
        }
        Action::Speech { content } => {
            if room.phase != Phase::Day || !room.speaking_allowed {
                return Err(EngineError::validation("discussion is not open"));
            }
            let speaker = room
                .participant(actor)
                .ok_or_else(|| EngineError::validation(format!("unknown participant {actor}")))?;
            if !speaker.alive {
                return Err(EngineError::validation("the dead do not speak"));
            }
            out.push((
                Audience::Everyone,
                MessageRecord::spoken(
                    MessageKind::Speech,
                    actor.clone(),
                    speaker.name.clone(),
                    content.clone(),
                    now,
                ),
            ));
        }
        Action::Vote { target } => {
            vote::cast_ballot(room, actor, target)?;
        }
        Action::Revenge { target } => {
            chain::apply_revenge(room, actor, target)?;
            announce(
                &mut out,
                format!(
                    "{} fires a last shot. {} goes down with them.",
                    room.name_of(actor),
                    room.name_of(target)
                ),
                now,
            );
            out.extend(chain_prompts(room, now));
            if chain::is_complete(room) {
                out.extend(finish_resolution(room, config, now)?);
            }
        }
        Action::LastWords { content } => {
            chain::record_last_words(room, actor)?;
            let name = room.name_of(actor);
            out.push((
                Audience::Everyone,
                MessageRecord::spoken(
                    MessageKind::LastWords,
                    actor.clone(),
                    name,
                    content.clone(),
                    now,
                ),
            ));
            if chain::is_complete(room) {
                out.extend(finish_resolution(room, config, now)?);
            }
        }
    }

    // Announce the next sub-phase's prompts once, when the step flips.
    let step_after = night::current_step(room);
    if room.phase == Phase::Night && step_after != step_before {
        out.extend(step_prompts(room, now));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Timeout dispatch
// ---------------------------------------------------------------------------

/// The opportunistic timeout check: if the current phase has expired,
/// apply exactly the transition appropriate to it. Safe to call
/// redundantly — an unexpired or untimed phase is a no-op, and the
/// transitions themselves reject duplicates.
pub fn on_timeout(
    room: &mut Room,
    config: &GameConfig,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    if !clock::is_expired(room, now) {
        return Ok(Vec::new());
    }
    tracing::debug!(room_id = %room.id, phase = %room.phase, "phase expired");
    match room.phase {
        Phase::RoleReveal => begin_night(room, config, now),
        Phase::Night => resolve_night(room, config, now),
        Phase::Day => begin_voting(room, config, now),
        Phase::Voting => resolve_votes(room, config, now),
        Phase::Resolution => expire_resolution(room, config, rng, now),
        Phase::Waiting | Phase::Ended => Ok(Vec::new()),
    }
}

/// The resolution grace ran out: substitute defaults for whatever is
/// still owed — a random legal revenge target, silence for last words —
/// then resume. Keeps one slow human from stalling the room forever.
fn expire_resolution(
    room: &mut Room,
    config: &GameConfig,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Result<Vec<Outbound>, EngineError> {
    let mut out = Vec::new();

    loop {
        let Some(shooter) = room
            .resolution
            .as_ref()
            .and_then(|s| s.pending_revenge.clone())
        else {
            break;
        };
        let candidates: Vec<ParticipantId> = room.living().map(|p| p.id.clone()).collect();
        let Some(target) = candidates.choose(rng).cloned() else {
            if let Some(state) = room.resolution.as_mut() {
                state.pending_revenge = None;
            }
            break;
        };
        chain::apply_revenge(room, &shooter, &target)?;
        announce(
            &mut out,
            format!(
                "{} fires a last shot. {} goes down with them.",
                room.name_of(&shooter),
                room.name_of(&target)
            ),
            now,
        );
    }

    let owed: Vec<ParticipantId> = room
        .resolution
        .as_mut()
        .map(|s| std::mem::take(&mut s.last_words))
        .unwrap_or_default();
    for speaker in owed {
        announce(
            &mut out,
            format!("{} had no last words.", room.name_of(&speaker)),
            now,
        );
    }

    out.extend(finish_resolution(room, config, now)?);
    Ok(out)
}
