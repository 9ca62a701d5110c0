//! The night protocol: ordered sub-phases and the night's resolution.
//!
//! The sequence is single-sourced in [`NIGHT_ORDER`] — one row per
//! acting role with its completion predicate — so "which role acts
//! when" lives in exactly one place and each handler below only
//! validates and records.

use serde::{Deserialize, Serialize};

use moonhall_protocol::{ParticipantId, WitchChoice};

use crate::error::EngineError;
use crate::role::Role;
use crate::room::{DeathCause, Phase, Room};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One role's turn within the night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightStep {
    Guardian,
    Wolves,
    Seer,
    Witch,
    Complete,
}

impl std::fmt::Display for NightStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Guardian => "guardian",
            Self::Wolves => "wolves",
            Self::Seer => "seer",
            Self::Witch => "witch",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// One wolf's individually cast kill vote. `seq` orders submissions for
/// the tie-break; a re-vote replaces the entry and takes a fresh number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WolfVote {
    pub voter: ParticipantId,
    pub target: ParticipantId,
    pub seq: u64,
}

/// Scratch record of one night's actions. Created fresh each Night,
/// discarded after its Resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightRecord {
    /// The sub-phase currently awaiting input.
    pub step: NightStep,
    pub guard_target: Option<ParticipantId>,
    pub wolf_votes: Vec<WolfVote>,
    next_seq: u64,
    pub seer_target: Option<ParticipantId>,
    pub witch: Option<WitchChoice>,
}

impl NightRecord {
    pub fn new() -> Self {
        Self {
            step: NightStep::Guardian,
            guard_target: None,
            wolf_votes: Vec::new(),
            next_seq: 0,
            seer_target: None,
            witch: None,
        }
    }
}

impl Default for NightRecord {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// The ordered sub-phase table
// ---------------------------------------------------------------------------

/// One row of the night sequence.
pub struct SubPhase {
    pub step: NightStep,
    pub role: Role,
    /// Has this sub-phase received everything it needs?
    pub complete: fn(&Room, &NightRecord) -> bool,
}

fn guardian_done(_room: &Room, record: &NightRecord) -> bool {
    record.guard_target.is_some()
}

fn wolves_done(room: &Room, record: &NightRecord) -> bool {
    // One entry per voter, so length equals distinct submitted votes.
    record.wolf_votes.len() >= room.living_with_role(Role::Wolf).count()
}

fn seer_done(_room: &Room, record: &NightRecord) -> bool {
    record.seer_target.is_some()
}

fn witch_done(_room: &Room, record: &NightRecord) -> bool {
    record.witch.is_some()
}

/// Guardian → Wolves → Seer → Witch. A row is skipped outright when its
/// role has no living holder.
pub const NIGHT_ORDER: [SubPhase; 4] = [
    SubPhase {
        step: NightStep::Guardian,
        role: Role::Guardian,
        complete: guardian_done,
    },
    SubPhase {
        step: NightStep::Wolves,
        role: Role::Wolf,
        complete: wolves_done,
    },
    SubPhase {
        step: NightStep::Seer,
        role: Role::Seer,
        complete: seer_done,
    },
    SubPhase {
        step: NightStep::Witch,
        role: Role::Witch,
        complete: witch_done,
    },
];

/// The first sub-phase still awaiting input, or Complete.
pub fn current_step(room: &Room) -> NightStep {
    let Some(record) = room.night.as_ref() else {
        return NightStep::Complete;
    };
    for row in &NIGHT_ORDER {
        if room.has_living(row.role) && !(row.complete)(room, record) {
            return row.step;
        }
    }
    NightStep::Complete
}

/// Recomputes and stores the record's step after a submission.
fn refresh_step(room: &mut Room) {
    let step = current_step(room);
    if let Some(record) = room.night.as_mut() {
        record.step = step;
    }
}

// ---------------------------------------------------------------------------
// Shared validation
// ---------------------------------------------------------------------------

fn require_step(room: &Room, step: NightStep) -> Result<(), EngineError> {
    if room.phase != Phase::Night {
        return Err(EngineError::validation(format!(
            "night actions are not accepted during {}",
            room.phase
        )));
    }
    let current = current_step(room);
    if current != step {
        return Err(EngineError::validation(format!(
            "it is the {current} turn, not {step}"
        )));
    }
    Ok(())
}

fn require_actor(room: &Room, id: &ParticipantId, role: Role) -> Result<(), EngineError> {
    match room.participant(id) {
        None => Err(EngineError::validation(format!("unknown participant {id}"))),
        Some(p) if !p.alive => Err(EngineError::validation("dead participants cannot act")),
        Some(p) if p.role != Some(role) => Err(EngineError::validation(format!(
            "only the {} may do that",
            role.display_name()
        ))),
        Some(_) => Ok(()),
    }
}

fn require_living_target(room: &Room, id: &ParticipantId) -> Result<(), EngineError> {
    match room.participant(id) {
        None => Err(EngineError::validation(format!("unknown target {id}"))),
        Some(p) if !p.alive => Err(EngineError::validation(format!(
            "{} is already dead",
            p.name
        ))),
        Some(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Legal guard targets: everyone living except last night's target.
/// Self-protection is allowed.
pub fn guardable_targets(room: &Room, actor: &ParticipantId) -> Vec<ParticipantId> {
    let previous = room
        .participant(actor)
        .and_then(|p| p.last_guard_target.clone());
    room.living()
        .map(|p| p.id.clone())
        .filter(|id| Some(id) != previous.as_ref())
        .collect()
}

/// Records the guardian's protection for tonight.
pub fn record_guard(
    room: &mut Room,
    actor: &ParticipantId,
    target: &ParticipantId,
) -> Result<(), EngineError> {
    require_step(room, NightStep::Guardian)?;
    require_actor(room, actor, Role::Guardian)?;
    require_living_target(room, target)?;

    let previous = room
        .participant(actor)
        .and_then(|p| p.last_guard_target.as_ref());
    if previous == Some(target) {
        return Err(EngineError::validation(
            "the guardian may not protect the same participant two nights running",
        ));
    }

    if let Some(record) = room.night.as_mut() {
        record.guard_target = Some(target.clone());
    }
    if let Some(p) = room.participant_mut(target) {
        p.guarded_tonight = true;
    }
    refresh_step(room);
    Ok(())
}

/// Records (or replaces) one wolf's kill vote. The sub-phase completes
/// when every living wolf has a vote in — a quorum, not one wolf
/// deciding for the pack.
pub fn record_wolf_vote(
    room: &mut Room,
    actor: &ParticipantId,
    target: &ParticipantId,
) -> Result<(), EngineError> {
    require_step(room, NightStep::Wolves)?;
    require_actor(room, actor, Role::Wolf)?;
    require_living_target(room, target)?;

    let record = room
        .night
        .as_mut()
        .ok_or_else(|| EngineError::validation("no night in progress"))?;
    let seq = record.next_seq;
    record.next_seq += 1;
    match record.wolf_votes.iter_mut().find(|v| &v.voter == actor) {
        Some(vote) => {
            // A re-vote is a new submission for tie-break purposes.
            vote.target = target.clone();
            vote.seq = seq;
        }
        None => record.wolf_votes.push(WolfVote {
            voter: actor.clone(),
            target: target.clone(),
            seq,
        }),
    }
    refresh_step(room);
    Ok(())
}

/// Records the seer's inspection and returns whether the target is
/// wolf-aligned. The caller delivers the result to the seer alone.
pub fn record_inspect(
    room: &mut Room,
    actor: &ParticipantId,
    target: &ParticipantId,
) -> Result<bool, EngineError> {
    require_step(room, NightStep::Seer)?;
    require_actor(room, actor, Role::Seer)?;
    require_living_target(room, target)?;
    if actor == target {
        return Err(EngineError::validation("the seer cannot inspect herself"));
    }

    let wolf_aligned = room
        .participant(target)
        .and_then(|p| p.role)
        .is_some_and(|r| r.is_wolf_aligned());

    if let Some(record) = room.night.as_mut() {
        record.seer_target = Some(target.clone());
    }
    if let Some(p) = room.participant_mut(target) {
        p.checked_tonight = true;
    }
    refresh_step(room);
    Ok(wolf_aligned)
}

/// Records the witch's choice: antidote, poison, or an explicit pass.
///
/// Each potion is single-use for the session. The antidote may only
/// target tonight's wolf-kill victim, and not the witch herself on
/// night one.
pub fn record_witch(
    room: &mut Room,
    actor: &ParticipantId,
    choice: &WitchChoice,
) -> Result<(), EngineError> {
    require_step(room, NightStep::Witch)?;
    require_actor(room, actor, Role::Witch)?;

    match choice {
        WitchChoice::Antidote { target } => {
            let witch = room.participant(actor).expect("validated above");
            if witch.antidote_used {
                return Err(EngineError::validation("the antidote is already spent"));
            }
            let victim = wolf_kill_target(room).ok_or_else(|| {
                EngineError::validation("there is no one to save tonight")
            })?;
            if target != &victim {
                return Err(EngineError::validation(
                    "the antidote can only save tonight's victim",
                ));
            }
            if room.night_count == 1 && target == actor {
                return Err(EngineError::validation(
                    "the witch cannot save herself on the first night",
                ));
            }
            if let Some(p) = room.participant_mut(actor) {
                p.antidote_used = true;
            }
        }
        WitchChoice::Poison { target } => {
            let witch = room.participant(actor).expect("validated above");
            if witch.poison_used {
                return Err(EngineError::validation("the poison is already spent"));
            }
            require_living_target(room, target)?;
            if let Some(p) = room.participant_mut(actor) {
                p.poison_used = true;
            }
        }
        WitchChoice::Abstain => {}
    }

    if let Some(record) = room.night.as_mut() {
        record.witch = Some(choice.clone());
    }
    refresh_step(room);
    Ok(())
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The wolves' chosen victim: plurality of votes, ties broken by the
/// earliest-submitted vote among the tied targets.
pub fn wolf_kill_target(room: &Room) -> Option<ParticipantId> {
    let record = room.night.as_ref()?;
    let mut tally: Vec<(ParticipantId, usize, u64)> = Vec::new();
    for vote in &record.wolf_votes {
        match tally.iter_mut().find(|(t, _, _)| t == &vote.target) {
            Some((_, count, min_seq)) => {
                *count += 1;
                *min_seq = (*min_seq).min(vote.seq);
            }
            None => tally.push((vote.target.clone(), 1, vote.seq)),
        }
    }
    tally
        .into_iter()
        .max_by_key(|(_, count, min_seq)| (*count, std::cmp::Reverse(*min_seq)))
        .map(|(target, _, _)| target)
}

/// The computed outcome of one night.
#[derive(Debug, Clone, PartialEq)]
pub struct NightOutcome {
    /// Deaths in the order they are announced. At most one record per
    /// participant even when wolves and poison pick the same victim.
    pub deaths: Vec<(ParticipantId, DeathCause)>,
    /// The wolf-kill target, if a save spared them.
    pub saved: Option<ParticipantId>,
}

/// Computes who dies tonight. Pure — applies nothing.
///
/// The wolf-kill target dies unless protected by *exactly one* of
/// guardian or antidote; protected by both, the saves cancel and the
/// target dies anyway. Poison kills unconditionally, guardian or not.
/// A victim both wolf-killed and poisoned yields a single death with
/// cause poison, which also suppresses a hunter's revenge.
pub fn night_outcome(room: &Room) -> NightOutcome {
    let record = match room.night.as_ref() {
        Some(r) => r,
        None => {
            return NightOutcome {
                deaths: Vec::new(),
                saved: None,
            };
        }
    };

    let mut deaths: Vec<(ParticipantId, DeathCause)> = Vec::new();
    let mut saved = None;

    if let Some(victim) = wolf_kill_target(room) {
        let guarded = record.guard_target.as_ref() == Some(&victim);
        let antidoted = matches!(
            &record.witch,
            Some(WitchChoice::Antidote { target }) if target == &victim
        );
        // XOR: exactly one protection saves; both at once cancel out.
        if guarded ^ antidoted {
            saved = Some(victim);
        } else {
            deaths.push((victim, DeathCause::Wolf));
        }
    }

    if let Some(WitchChoice::Poison { target }) = &record.witch {
        match deaths.iter_mut().find(|(id, _)| id == target) {
            Some(entry) => entry.1 = DeathCause::Poison,
            None => deaths.push((target.clone(), DeathCause::Poison)),
        }
    }

    NightOutcome { deaths, saved }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use moonhall_protocol::RoomId;

    use crate::room::Participant;

    use super::*;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::from(s)
    }

    /// A mid-night room: roles assigned, record fresh.
    fn night_room(roles: &[(&str, Role)]) -> Room {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 22, 0, 0).unwrap();
        let mut room = Room::new(RoomId::from("r1"), now);
        for (id, role) in roles {
            let mut p = Participant::new(pid(id), id.to_string(), false);
            p.role = Some(*role);
            room.participants.push(p);
        }
        room.phase = Phase::Night;
        room.night_count = 1;
        room.night = Some(NightRecord::new());
        let step = current_step(&room);
        if let Some(r) = room.night.as_mut() {
            r.step = step;
        }
        room
    }

    fn classic_four() -> Room {
        night_room(&[
            ("wolf", Role::Wolf),
            ("seer", Role::Seer),
            ("witch", Role::Witch),
            ("villager", Role::Villager),
        ])
    }

    #[test]
    fn steps_skip_roles_without_living_holders() {
        // No guardian in the roster: the night opens on the wolves.
        let room = classic_four();
        assert_eq!(current_step(&room), NightStep::Wolves);
    }

    #[test]
    fn full_roster_walks_the_table_in_order() {
        let mut room = night_room(&[
            ("guardian", Role::Guardian),
            ("wolf", Role::Wolf),
            ("seer", Role::Seer),
            ("witch", Role::Witch),
        ]);
        assert_eq!(current_step(&room), NightStep::Guardian);

        record_guard(&mut room, &pid("guardian"), &pid("seer")).unwrap();
        assert_eq!(current_step(&room), NightStep::Wolves);

        record_wolf_vote(&mut room, &pid("wolf"), &pid("seer")).unwrap();
        assert_eq!(current_step(&room), NightStep::Seer);

        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();
        assert_eq!(current_step(&room), NightStep::Witch);

        record_witch(&mut room, &pid("witch"), &WitchChoice::Abstain).unwrap();
        assert_eq!(current_step(&room), NightStep::Complete);
    }

    #[test]
    fn acting_out_of_turn_is_rejected() {
        let mut room = night_room(&[
            ("guardian", Role::Guardian),
            ("wolf", Role::Wolf),
            ("villager", Role::Villager),
            ("villager2", Role::Villager),
        ]);
        // Wolves before the guardian has acted.
        let err = record_wolf_vote(&mut room, &pid("wolf"), &pid("villager")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn guardian_cannot_repeat_last_nights_target() {
        let mut room = night_room(&[
            ("guardian", Role::Guardian),
            ("wolf", Role::Wolf),
            ("villager", Role::Villager),
            ("villager2", Role::Villager),
        ]);
        room.participant_mut(&pid("guardian")).unwrap().last_guard_target =
            Some(pid("villager"));

        let err = record_guard(&mut room, &pid("guardian"), &pid("villager")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // A different target is fine, and so is self-protection.
        record_guard(&mut room, &pid("guardian"), &pid("guardian")).unwrap();
        assert_eq!(
            room.night.as_ref().unwrap().guard_target,
            Some(pid("guardian"))
        );
    }

    #[test]
    fn guardable_targets_exclude_previous_night_only() {
        let mut room = night_room(&[
            ("guardian", Role::Guardian),
            ("wolf", Role::Wolf),
            ("villager", Role::Villager),
            ("villager2", Role::Villager),
        ]);
        room.participant_mut(&pid("guardian")).unwrap().last_guard_target =
            Some(pid("villager"));
        let targets = guardable_targets(&room, &pid("guardian"));
        assert!(!targets.contains(&pid("villager")));
        assert!(targets.contains(&pid("guardian")));
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn wolf_plurality_picks_the_most_voted_target() {
        let mut room = night_room(&[
            ("w1", Role::Wolf),
            ("w2", Role::Wolf),
            ("w3", Role::Wolf),
            ("a", Role::Villager),
            ("b", Role::Villager),
            ("c", Role::Villager),
        ]);
        record_wolf_vote(&mut room, &pid("w1"), &pid("a")).unwrap();
        record_wolf_vote(&mut room, &pid("w2"), &pid("b")).unwrap();
        record_wolf_vote(&mut room, &pid("w3"), &pid("b")).unwrap();
        assert_eq!(wolf_kill_target(&room), Some(pid("b")));
        assert_eq!(current_step(&room), NightStep::Complete);
    }

    #[test]
    fn wolf_tie_breaks_to_earliest_submission() {
        let mut room = night_room(&[
            ("w1", Role::Wolf),
            ("w2", Role::Wolf),
            ("a", Role::Villager),
            ("b", Role::Villager),
            ("c", Role::Villager),
            ("d", Role::Villager),
        ]);
        record_wolf_vote(&mut room, &pid("w1"), &pid("a")).unwrap();
        record_wolf_vote(&mut room, &pid("w2"), &pid("b")).unwrap();
        // 1-1 tie: "a" was submitted first.
        assert_eq!(wolf_kill_target(&room), Some(pid("a")));
    }

    #[test]
    fn wolf_revote_replaces_and_resets_submission_order() {
        let mut room = night_room(&[
            ("w1", Role::Wolf),
            ("w2", Role::Wolf),
            ("a", Role::Villager),
            ("b", Role::Villager),
            ("c", Role::Villager),
            ("d", Role::Villager),
        ]);
        record_wolf_vote(&mut room, &pid("w1"), &pid("a")).unwrap();
        record_wolf_vote(&mut room, &pid("w2"), &pid("b")).unwrap();
        // w1 moves to "c": the 1-1 tie between "b" and "c" now goes to
        // "b", whose vote is the earliest remaining submission.
        record_wolf_vote(&mut room, &pid("w1"), &pid("c")).unwrap();
        assert_eq!(room.night.as_ref().unwrap().wolf_votes.len(), 2);
        assert_eq!(wolf_kill_target(&room), Some(pid("b")));
    }

    #[test]
    fn seer_cannot_inspect_self_or_the_dead() {
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("villager")).unwrap();

        let err = record_inspect(&mut room, &pid("seer"), &pid("seer")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        room.participant_mut(&pid("villager")).unwrap().alive = false;
        let err = record_inspect(&mut room, &pid("seer"), &pid("villager")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn seer_learns_alignment_only() {
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("villager")).unwrap();
        let wolf_aligned = record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();
        assert!(wolf_aligned);
        assert!(room.participant(&pid("wolf")).unwrap().checked_tonight);
    }

    #[test]
    fn antidote_must_target_tonights_victim() {
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("seer")).unwrap();
        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();

        let err = record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Antidote {
                target: pid("villager"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Antidote { target: pid("seer") },
        )
        .unwrap();
        assert!(room.participant(&pid("witch")).unwrap().antidote_used);
    }

    #[test]
    fn witch_cannot_save_herself_on_night_one() {
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("witch")).unwrap();
        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();

        let err = record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Antidote { target: pid("witch") },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // From night two on, the self-save is legal.
        room.night_count = 2;
        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Antidote { target: pid("witch") },
        )
        .unwrap();
    }

    #[test]
    fn spent_potions_stay_spent() {
        let mut room = classic_four();
        room.participant_mut(&pid("witch")).unwrap().poison_used = true;
        record_wolf_vote(&mut room, &pid("wolf"), &pid("seer")).unwrap();
        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();

        let err = record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Poison {
                target: pid("villager"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    // --- outcome ------------------------------------------------------

    fn guarded_room() -> Room {
        night_room(&[
            ("guardian", Role::Guardian),
            ("wolf", Role::Wolf),
            ("witch", Role::Witch),
            ("villager", Role::Villager),
        ])
    }

    #[test]
    fn unprotected_victim_dies_to_the_wolves() {
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("seer")).unwrap();
        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();
        record_witch(&mut room, &pid("witch"), &WitchChoice::Abstain).unwrap();

        let outcome = night_outcome(&room);
        assert_eq!(outcome.deaths, vec![(pid("seer"), DeathCause::Wolf)]);
        assert_eq!(outcome.saved, None);
    }

    #[test]
    fn single_protection_saves_the_victim() {
        // Guardian alone.
        let mut room = guarded_room();
        record_guard(&mut room, &pid("guardian"), &pid("villager")).unwrap();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("villager")).unwrap();
        record_witch(&mut room, &pid("witch"), &WitchChoice::Abstain).unwrap();
        let outcome = night_outcome(&room);
        assert!(outcome.deaths.is_empty());
        assert_eq!(outcome.saved, Some(pid("villager")));

        // Antidote alone.
        let mut room = guarded_room();
        record_guard(&mut room, &pid("guardian"), &pid("guardian")).unwrap();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("villager")).unwrap();
        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Antidote {
                target: pid("villager"),
            },
        )
        .unwrap();
        let outcome = night_outcome(&room);
        assert!(outcome.deaths.is_empty());
        assert_eq!(outcome.saved, Some(pid("villager")));
    }

    #[test]
    fn double_save_means_death() {
        let mut room = guarded_room();
        record_guard(&mut room, &pid("guardian"), &pid("villager")).unwrap();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("villager")).unwrap();
        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Antidote {
                target: pid("villager"),
            },
        )
        .unwrap();

        let outcome = night_outcome(&room);
        assert_eq!(outcome.deaths, vec![(pid("villager"), DeathCause::Wolf)]);
        assert_eq!(outcome.saved, None);
    }

    #[test]
    fn poison_ignores_the_guardian() {
        let mut room = guarded_room();
        record_guard(&mut room, &pid("guardian"), &pid("villager")).unwrap();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("guardian")).unwrap();
        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Poison {
                target: pid("villager"),
            },
        )
        .unwrap();

        let outcome = night_outcome(&room);
        assert!(outcome
            .deaths
            .contains(&(pid("villager"), DeathCause::Poison)));
        assert!(outcome
            .deaths
            .contains(&(pid("guardian"), DeathCause::Wolf)));
        assert_eq!(outcome.deaths.len(), 2);
    }

    #[test]
    fn poisoned_wolf_victim_is_one_death_with_cause_poison() {
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("villager")).unwrap();
        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();
        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Poison {
                target: pid("villager"),
            },
        )
        .unwrap();

        let outcome = night_outcome(&room);
        assert_eq!(outcome.deaths, vec![(pid("villager"), DeathCause::Poison)]);
    }

    #[test]
    fn antidote_on_the_wolf_victim_means_no_deaths() {
        // 4 seats {Wolf, Seer, Witch, Villager}; wolf kills the seer,
        // witch saves her.
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("seer")).unwrap();
        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();
        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Antidote { target: pid("seer") },
        )
        .unwrap();

        let outcome = night_outcome(&room);
        assert!(outcome.deaths.is_empty());
        assert!(room.participant(&pid("witch")).unwrap().antidote_used);
    }

    #[test]
    fn poison_elsewhere_leaves_the_wolf_victim_to_die() {
        // Same setup, witch poisons the villager instead: the seer dies
        // to the wolves, the villager to the poison.
        let mut room = classic_four();
        record_wolf_vote(&mut room, &pid("wolf"), &pid("seer")).unwrap();
        record_inspect(&mut room, &pid("seer"), &pid("wolf")).unwrap();
        record_witch(
            &mut room,
            &pid("witch"),
            &WitchChoice::Poison {
                target: pid("villager"),
            },
        )
        .unwrap();

        let outcome = night_outcome(&room);
        assert_eq!(outcome.deaths.len(), 2);
        assert!(outcome.deaths.contains(&(pid("seer"), DeathCause::Wolf)));
        assert!(outcome
            .deaths
            .contains(&(pid("villager"), DeathCause::Poison)));
    }
}
