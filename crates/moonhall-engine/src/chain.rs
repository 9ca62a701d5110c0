//! Death-triggered abilities and last words.
//!
//! When deaths are applied, normal progression suspends in the
//! Resolution phase until the chain drains: a dead hunter owes a
//! revenge shot, and every newly-dead participant gets one chance at a
//! final statement. Revenge can retrigger the chain (the target may be
//! another unused hunter); the ability is consumed exactly once per
//! holder, which bounds the recursion by the roster size.

use moonhall_protocol::ParticipantId;

use crate::error::EngineError;
use crate::role::Role;
use crate::room::{DeathCause, Phase, ResolutionKind, ResolutionState, Room};

/// Sets up the suspended state after `newly_dead` were applied.
pub fn arm(room: &mut Room, kind: ResolutionKind, newly_dead: &[(ParticipantId, DeathCause)]) {
    let pending_revenge = newly_dead
        .iter()
        .find(|(id, cause)| revenge_triggers(room, id, *cause))
        .map(|(id, _)| id.clone());

    room.resolution = Some(ResolutionState {
        kind,
        pending_revenge,
        last_words: newly_dead.iter().map(|(id, _)| id.clone()).collect(),
    });
}

/// A hunter shoots back unless poison silenced him or the shot is spent.
fn revenge_triggers(room: &Room, id: &ParticipantId, cause: DeathCause) -> bool {
    if cause == DeathCause::Poison {
        return false;
    }
    room.participant(id)
        .is_some_and(|p| p.role == Some(Role::Hunter) && !p.revenge_used)
}

/// True when nothing suspends progression any more.
pub fn is_complete(room: &Room) -> bool {
    match &room.resolution {
        None => true,
        Some(state) => state.pending_revenge.is_none() && state.last_words.is_empty(),
    }
}

/// Applies a hunter's revenge shot.
///
/// Returns the deaths it caused (exactly one, plus whatever a
/// retriggered chain will add later). The shooter's ability is consumed
/// even though he is already dead — that is the once-per-holder bound.
pub fn apply_revenge(
    room: &mut Room,
    shooter: &ParticipantId,
    target: &ParticipantId,
) -> Result<Vec<(ParticipantId, DeathCause)>, EngineError> {
    if room.phase != Phase::Resolution {
        return Err(EngineError::validation(format!(
            "revenge is not accepted during {}",
            room.phase
        )));
    }
    let pending = room
        .resolution
        .as_ref()
        .and_then(|s| s.pending_revenge.as_ref());
    if pending != Some(shooter) {
        return Err(EngineError::validation("no revenge shot is owed by you"));
    }
    match room.participant(target) {
        None => return Err(EngineError::validation(format!("unknown target {target}"))),
        Some(p) if !p.alive => {
            return Err(EngineError::validation(format!("{} is already dead", p.name)));
        }
        Some(_) => {}
    }
    if shooter == target {
        return Err(EngineError::validation("the shot must hit someone else"));
    }

    if let Some(p) = room.participant_mut(shooter) {
        p.revenge_used = true;
    }
    room.kill(target, DeathCause::Hunter);
    let newly_dead = vec![(target.clone(), DeathCause::Hunter)];

    let retrigger = revenge_triggers(room, target, DeathCause::Hunter);
    if let Some(state) = room.resolution.as_mut() {
        state.pending_revenge = retrigger.then(|| target.clone());
        state.last_words.push(target.clone());
    }

    tracing::debug!(
        room_id = %room.id,
        %shooter,
        %target,
        retrigger,
        "revenge shot applied"
    );
    Ok(newly_dead)
}

/// Marks one dying participant's last words as spoken.
pub fn record_last_words(room: &mut Room, speaker: &ParticipantId) -> Result<(), EngineError> {
    if room.phase != Phase::Resolution {
        return Err(EngineError::validation(format!(
            "last words are not accepted during {}",
            room.phase
        )));
    }
    let state = room
        .resolution
        .as_mut()
        .ok_or_else(|| EngineError::validation("nothing is being resolved"))?;
    // Last words wait until any owed revenge shot has been fired, so
    // the chain's own victims get their turn to speak too.
    if state.pending_revenge.is_some() {
        return Err(EngineError::validation("a revenge shot is still owed"));
    }
    match state.last_words.iter().position(|id| id == speaker) {
        Some(i) => {
            state.last_words.remove(i);
            Ok(())
        }
        None => Err(EngineError::validation("no last words are owed by you")),
    }
}
