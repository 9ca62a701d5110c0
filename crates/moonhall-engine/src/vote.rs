//! Day ballots and the tie-break rule.

use moonhall_protocol::ParticipantId;

use crate::error::EngineError;
use crate::room::{Phase, Room};

/// Records (or replaces) one participant's ballot.
///
/// Only the living vote and only the living may be voted for; self-votes
/// are rejected. Ballots are collected until the phase times out —
/// voting never resolves early, even with every ballot in, so fast
/// voters cannot lock in a result ahead of slower clients.
pub fn cast_ballot(
    room: &mut Room,
    voter: &ParticipantId,
    target: &ParticipantId,
) -> Result<(), EngineError> {
    if room.phase != Phase::Voting {
        return Err(EngineError::validation(format!(
            "ballots are not accepted during {}",
            room.phase
        )));
    }
    match room.participant(voter) {
        None => return Err(EngineError::validation(format!("unknown participant {voter}"))),
        Some(p) if !p.alive => {
            return Err(EngineError::validation("the dead do not vote"));
        }
        Some(_) => {}
    }
    match room.participant(target) {
        None => return Err(EngineError::validation(format!("unknown target {target}"))),
        Some(p) if !p.alive => {
            return Err(EngineError::validation(format!("{} is already dead", p.name)));
        }
        Some(_) => {}
    }
    if voter == target {
        return Err(EngineError::validation("you cannot vote for yourself"));
    }

    room.ballots.insert(voter.clone(), target.clone());
    Ok(())
}

/// The result of tallying a Voting phase.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    /// The sole plurality holder, if there is one.
    pub eliminated: Option<ParticipantId>,
    /// Everyone who shared the top count (useful for the tie message).
    pub top: Vec<ParticipantId>,
}

/// Tallies the current ballots. A unique plurality target is eliminated;
/// a tie among two or more eliminates no one.
pub fn tally(room: &Room) -> VoteOutcome {
    let mut counts: Vec<(ParticipantId, usize)> = Vec::new();
    for target in room.ballots.values() {
        match counts.iter_mut().find(|(t, _)| t == target) {
            Some((_, n)) => *n += 1,
            None => counts.push((target.clone(), 1)),
        }
    }

    let Some(max) = counts.iter().map(|(_, n)| *n).max() else {
        return VoteOutcome {
            eliminated: None,
            top: Vec::new(),
        };
    };
    let top: Vec<ParticipantId> = counts
        .into_iter()
        .filter(|(_, n)| *n == max)
        .map(|(t, _)| t)
        .collect();

    VoteOutcome {
        eliminated: (top.len() == 1).then(|| top[0].clone()),
        top,
    }
}
