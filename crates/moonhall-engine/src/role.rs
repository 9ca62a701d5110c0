//! The role table and role assignment.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use crate::error::EngineError;

/// A participant's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Wolf,
    Villager,
    Seer,
    Witch,
    Hunter,
    Guardian,
}

/// What a role may target with its ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// No targeted ability.
    None,
    /// Any living participant, self included.
    AnyLiving,
    /// Any living participant other than the actor.
    OtherLiving,
}

/// Static description of a role's ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Does this role act during the night protocol?
    pub night_actor: bool,
    /// Who the ability may target.
    pub target: TargetKind,
    /// Is the ability consumed permanently once used?
    pub single_use: bool,
}

impl Role {
    /// Seer results report alignment, not the exact role.
    pub fn is_wolf_aligned(self) -> bool {
        matches!(self, Self::Wolf)
    }

    /// The role's ability descriptor.
    pub fn capability(self) -> Capability {
        match self {
            Self::Wolf => Capability {
                night_actor: true,
                target: TargetKind::AnyLiving,
                single_use: false,
            },
            Self::Villager => Capability {
                night_actor: false,
                target: TargetKind::None,
                single_use: false,
            },
            Self::Seer => Capability {
                night_actor: true,
                target: TargetKind::OtherLiving,
                single_use: false,
            },
            // Each potion is single-use for the whole session.
            Self::Witch => Capability {
                night_actor: true,
                target: TargetKind::AnyLiving,
                single_use: true,
            },
            Self::Hunter => Capability {
                night_actor: false,
                target: TargetKind::OtherLiving,
                single_use: true,
            },
            Self::Guardian => Capability {
                night_actor: true,
                target: TargetKind::AnyLiving,
                single_use: false,
            },
        }
    }

    /// Human-readable name used in host messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Wolf => "Wolf",
            Self::Villager => "Villager",
            Self::Seer => "Seer",
            Self::Witch => "Witch",
            Self::Hunter => "Hunter",
            Self::Guardian => "Guardian",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Power roles dealt in order until the cap is reached.
const POWER_ROLES: [Role; 4] = [Role::Seer, Role::Witch, Role::Hunter, Role::Guardian];

/// The classic 12-seat composition: 4 wolves, 4 powers, 4 villagers.
const FULL_TABLE: [Role; 12] = [
    Role::Wolf,
    Role::Wolf,
    Role::Wolf,
    Role::Wolf,
    Role::Seer,
    Role::Witch,
    Role::Hunter,
    Role::Guardian,
    Role::Villager,
    Role::Villager,
    Role::Villager,
    Role::Villager,
];

/// Builds a shuffled role list for `count` participants.
///
/// At exactly 12 the fixed composition is used; otherwise wolves =
/// max(1, n/3), power roles dealt in table order capped at max(1, n/3),
/// remainder villagers. Pure — the caller supplies the RNG.
pub fn assign_roles(count: usize, rng: &mut impl Rng) -> Result<Vec<Role>, EngineError> {
    if count < MIN_PARTICIPANTS {
        return Err(EngineError::Configuration(format!(
            "need at least {MIN_PARTICIPANTS} participants, have {count}"
        )));
    }
    if count > MAX_PARTICIPANTS {
        return Err(EngineError::Configuration(format!(
            "at most {MAX_PARTICIPANTS} participants, have {count}"
        )));
    }

    let mut roles: Vec<Role> = if count == MAX_PARTICIPANTS {
        FULL_TABLE.to_vec()
    } else {
        let wolves = (count / 3).max(1);
        let powers = (count / 3).max(1).min(POWER_ROLES.len());
        let mut roles = vec![Role::Wolf; wolves];
        roles.extend_from_slice(&POWER_ROLES[..powers]);
        roles.truncate(count);
        while roles.len() < count {
            roles.push(Role::Villager);
        }
        roles
    };

    roles.shuffle(rng);
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn rejects_fewer_than_four() {
        for n in 0..4 {
            assert!(matches!(
                assign_roles(n, &mut rng()),
                Err(EngineError::Configuration(_))
            ));
        }
    }

    #[test]
    fn rejects_more_than_twelve() {
        assert!(matches!(
            assign_roles(13, &mut rng()),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn every_size_gets_exactly_n_roles_with_wolves() {
        for n in 4..=12 {
            let roles = assign_roles(n, &mut rng()).unwrap();
            assert_eq!(roles.len(), n, "size {n}");
            assert!(
                roles.iter().any(|r| *r == Role::Wolf),
                "size {n} has no wolf"
            );
        }
    }

    #[test]
    fn twelve_uses_the_fixed_composition() {
        let roles = assign_roles(12, &mut rng()).unwrap();
        let count = |role| roles.iter().filter(|r| **r == role).count();
        assert_eq!(count(Role::Wolf), 4);
        assert_eq!(count(Role::Seer), 1);
        assert_eq!(count(Role::Witch), 1);
        assert_eq!(count(Role::Hunter), 1);
        assert_eq!(count(Role::Guardian), 1);
        assert_eq!(count(Role::Villager), 4);
    }

    #[test]
    fn six_seats_deal_two_wolves_and_two_powers() {
        let roles = assign_roles(6, &mut rng()).unwrap();
        let count = |role| roles.iter().filter(|r| **r == role).count();
        assert_eq!(count(Role::Wolf), 2);
        assert_eq!(count(Role::Seer), 1);
        assert_eq!(count(Role::Witch), 1);
        assert_eq!(count(Role::Villager), 2);
    }

    #[test]
    fn four_seats_still_have_one_wolf_and_one_power() {
        let roles = assign_roles(4, &mut rng()).unwrap();
        let wolves = roles.iter().filter(|r| **r == Role::Wolf).count();
        assert_eq!(wolves, 1);
        assert!(roles.contains(&Role::Seer));
    }

    #[test]
    fn shuffle_depends_on_seed() {
        let a = assign_roles(12, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = assign_roles(12, &mut StdRng::seed_from_u64(2)).unwrap();
        // Same multiset either way.
        let mut sa = a.clone();
        let mut sb = b.clone();
        sa.sort_by_key(|r| format!("{r:?}"));
        sb.sort_by_key(|r| format!("{r:?}"));
        assert_eq!(sa, sb);
        // Orders almost surely differ across seeds.
        assert_ne!(a, b);
    }

    #[test]
    fn capability_table_matches_the_rules() {
        assert!(Role::Guardian.capability().night_actor);
        assert!(!Role::Hunter.capability().night_actor);
        assert!(Role::Hunter.capability().single_use);
        assert!(Role::Witch.capability().single_use);
        assert_eq!(Role::Villager.capability().target, TargetKind::None);
        assert!(Role::Wolf.is_wolf_aligned());
        assert!(!Role::Seer.is_wolf_aligned());
    }
}
