//! The surrogate decision maker.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use moonhall_engine::night;
use moonhall_engine::{Role, Room};
use moonhall_protocol::{ParticipantId, WitchChoice};

use crate::completion::TextCompletion;

/// Supplies actions for computer-controlled participants.
///
/// Every decision runs the same way: ask the completion collaborator,
/// parse the reply against the legal target set, and fall back to a
/// rule-respecting random choice if the reply is empty, unparsable, or
/// names an illegal target.
pub struct SurrogateActor {
    completion: Arc<dyn TextCompletion>,
}

impl SurrogateActor {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    async fn ask(&self, system: &str, user: &str) -> Option<String> {
        match self.completion.complete(system, user).await {
            Ok(reply) if !reply.trim().is_empty() => Some(reply),
            Ok(_) => {
                tracing::debug!("completion reply empty, falling back");
                None
            }
            Err(err) => {
                // Collaborator trouble stays our problem, never the players'.
                tracing::debug!(error = %err, "completion failed, falling back");
                None
            }
        }
    }

    /// Ask-parse-fallback for a pick-one-name decision.
    async fn pick(
        &self,
        room: &Room,
        actor: &ParticipantId,
        instruction: &str,
        candidates: Vec<ParticipantId>,
    ) -> Option<ParticipantId> {
        if candidates.is_empty() {
            return None;
        }
        let names: Vec<String> = candidates.iter().map(|id| room.name_of(id)).collect();
        let user = format!("{instruction} Options: {}.", names.join(", "));
        if let Some(reply) = self.ask(&persona(room, actor), &user).await {
            if let Some(target) = parse_target(&reply, room, &candidates) {
                return Some(target);
            }
            tracing::debug!(%actor, reply, "completion reply unparsable, falling back");
        }
        let mut rng = StdRng::from_os_rng();
        candidates.choose(&mut rng).cloned()
    }

    /// A guard target for a surrogate guardian.
    pub async fn guard_target(
        &self,
        room: &Room,
        actor: &ParticipantId,
    ) -> Option<ParticipantId> {
        let candidates = night::guardable_targets(room, actor);
        self.pick(room, actor, "Choose one player to protect tonight.", candidates)
            .await
    }

    /// A kill vote for a surrogate wolf. Never a packmate, never the dead.
    pub async fn wolf_target(
        &self,
        room: &Room,
        actor: &ParticipantId,
    ) -> Option<ParticipantId> {
        let candidates = wolf_candidates(room);
        self.pick(room, actor, "Choose one player for the pack to hunt tonight.", candidates)
            .await
    }

    /// An inspection target for a surrogate seer.
    pub async fn inspect_target(
        &self,
        room: &Room,
        actor: &ParticipantId,
    ) -> Option<ParticipantId> {
        let candidates = others(room, actor);
        self.pick(room, actor, "Choose one player to inspect tonight.", candidates)
            .await
    }

    /// The witch's antidote/poison/pass decision. Falls back to passing,
    /// which is always legal.
    pub async fn witch_choice(&self, room: &Room, actor: &ParticipantId) -> WitchChoice {
        let witch = match room.participant(actor) {
            Some(p) => p,
            None => return WitchChoice::Abstain,
        };
        let victim = night::wolf_kill_target(room);
        let can_save = !witch.antidote_used
            && victim.is_some()
            && !(room.night_count == 1 && victim.as_ref() == Some(actor));
        let poison_targets = if witch.poison_used {
            Vec::new()
        } else {
            others(room, actor)
        };

        let mut user = String::from("Decide your night action. Reply with exactly one of:");
        if can_save {
            let name = room.name_of(victim.as_ref().expect("checked above"));
            user.push_str(&format!(" 'save' (rescue {name}),"));
        }
        if !poison_targets.is_empty() {
            user.push_str(" 'poison <name>',");
        }
        user.push_str(" 'pass'.");

        if let Some(reply) = self.ask(&persona(room, actor), &user).await {
            let lowered = reply.to_lowercase();
            if can_save && lowered.contains("save") {
                return WitchChoice::Antidote {
                    target: victim.expect("checked above"),
                };
            }
            if lowered.contains("poison") {
                if let Some(target) = parse_target(&reply, room, &poison_targets) {
                    return WitchChoice::Poison { target };
                }
            }
        }
        WitchChoice::Abstain
    }

    /// A day ballot.
    pub async fn vote_target(
        &self,
        room: &Room,
        actor: &ParticipantId,
    ) -> Option<ParticipantId> {
        let candidates = vote_candidates(room, actor);
        self.pick(room, actor, "Choose one player to vote out.", candidates)
            .await
    }

    /// A revenge target for a surrogate hunter. Surrogates always choose.
    pub async fn revenge_target(
        &self,
        room: &Room,
        actor: &ParticipantId,
    ) -> Option<ParticipantId> {
        let candidates = others(room, actor);
        self.pick(
            room,
            actor,
            "You were taken down. Choose one player to shoot on your way out.",
            candidates,
        )
        .await
    }

    /// A day-phase statement.
    pub async fn speech(&self, room: &Room, actor: &ParticipantId) -> String {
        let user = format!(
            "It is day {}. The living players are {}. Say something brief to the village.",
            room.day_count,
            living_names(room).join(", ")
        );
        match self.ask(&persona(room, actor), &user).await {
            Some(reply) => reply,
            None => "I have nothing to add yet, but I'm watching closely.".to_string(),
        }
    }

    /// A final statement on the way out.
    pub async fn last_words(&self, room: &Room, actor: &ParticipantId) -> String {
        let user = "You have just been eliminated. Give a one-sentence parting statement.";
        match self.ask(&persona(room, actor), user).await {
            Some(reply) => reply,
            None => "It seems my part ends here. Good luck, everyone.".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Legal target sets
// ---------------------------------------------------------------------------

fn living_names(room: &Room) -> Vec<String> {
    room.living().map(|p| p.name.clone()).collect()
}

fn others(room: &Room, actor: &ParticipantId) -> Vec<ParticipantId> {
    room.living()
        .filter(|p| &p.id != actor)
        .map(|p| p.id.clone())
        .collect()
}

/// Living non-wolves: a surrogate wolf never turns on the pack.
fn wolf_candidates(room: &Room) -> Vec<ParticipantId> {
    room.living()
        .filter(|p| p.role != Some(Role::Wolf))
        .map(|p| p.id.clone())
        .collect()
}

/// Living others; a surrogate wolf also spares packmates at the ballot box.
fn vote_candidates(room: &Room, actor: &ParticipantId) -> Vec<ParticipantId> {
    let actor_is_wolf = room
        .participant(actor)
        .is_some_and(|p| p.role == Some(Role::Wolf));
    room.living()
        .filter(|p| &p.id != actor)
        .filter(|p| !(actor_is_wolf && p.role == Some(Role::Wolf)))
        .map(|p| p.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Parsing and prompts
// ---------------------------------------------------------------------------

fn persona(room: &Room, actor: &ParticipantId) -> String {
    let name = room.name_of(actor);
    format!(
        "You are {name}, a player in a werewolf social-deduction game. \
         When asked to choose a player, answer with exactly one name from \
         the offered options and nothing else."
    )
}

/// Matches a completion reply against the legal candidates: exact id,
/// exact name (case-insensitive), then name-contained-in-reply with the
/// longest names tried first so "player-12" is not mistaken for
/// "player-1".
fn parse_target(
    reply: &str,
    room: &Room,
    candidates: &[ParticipantId],
) -> Option<ParticipantId> {
    let trimmed = reply.trim();
    let lowered = trimmed.to_lowercase();

    if let Some(id) = candidates.iter().find(|id| id.0 == trimmed) {
        return Some(id.clone());
    }
    if let Some(id) = candidates
        .iter()
        .find(|id| room.name_of(id).to_lowercase() == lowered)
    {
        return Some(id.clone());
    }

    let mut by_name: Vec<(ParticipantId, String)> = candidates
        .iter()
        .map(|id| (id.clone(), room.name_of(id).to_lowercase()))
        .collect();
    by_name.sort_by_key(|(_, name)| std::cmp::Reverse(name.len()));
    by_name
        .into_iter()
        .find(|(_, name)| !name.is_empty() && lowered.contains(name.as_str()))
        .map(|(id, _)| id)
}

// ---------------------------------------------------------------------------
// Seedable fallbacks (exposed for the timeout path and tests)
// ---------------------------------------------------------------------------

/// The rule-respecting random wolf vote.
pub fn fallback_wolf_target(room: &Room, rng: &mut impl Rng) -> Option<ParticipantId> {
    wolf_candidates(room).choose(rng).cloned()
}

/// The rule-respecting random guard choice.
pub fn fallback_guard_target(
    room: &Room,
    actor: &ParticipantId,
    rng: &mut impl Rng,
) -> Option<ParticipantId> {
    night::guardable_targets(room, actor).choose(rng).cloned()
}

/// The rule-respecting random ballot.
pub fn fallback_vote_target(
    room: &Room,
    actor: &ParticipantId,
    rng: &mut impl Rng,
) -> Option<ParticipantId> {
    vote_candidates(room, actor).choose(rng).cloned()
}
