//! Phase timing.
//!
//! There is no per-room timer task. Expiry is evaluated whenever a room
//! is next read, so a phase duration is a lower bound on the phase's
//! real length, not an exact deadline.

use chrono::{DateTime, TimeDelta, Utc};

use crate::room::Room;

/// Abstraction over wall-clock time so tests can drive it explicitly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whether the room's current phase has run past its duration.
/// Untimed phases (duration 0) never expire.
pub fn is_expired(room: &Room, now: DateTime<Utc>) -> bool {
    if !room.phase.is_timed() || room.phase_duration_secs == 0 {
        return false;
    }
    let elapsed = now.signed_duration_since(room.phase_start);
    elapsed >= TimeDelta::seconds(room.phase_duration_secs as i64)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use moonhall_protocol::RoomId;

    use crate::room::Phase;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn expiry_is_elapsed_at_least_duration() {
        let mut room = Room::new(RoomId::from("r1"), at(0));
        room.set_phase(Phase::Night, at(0), 120);

        assert!(!is_expired(&room, at(0)));
        assert!(!is_expired(&room, at(119)));
        assert!(is_expired(&room, at(120)));
        assert!(is_expired(&room, at(10_000)));
    }

    #[test]
    fn untimed_phases_never_expire() {
        let room = Room::new(RoomId::from("r1"), at(0));
        assert_eq!(room.phase, Phase::Waiting);
        assert!(!is_expired(&room, at(1_000_000)));
    }

    #[test]
    fn clock_going_backwards_does_not_expire() {
        let mut room = Room::new(RoomId::from("r1"), at(500));
        room.set_phase(Phase::Day, at(500), 60);
        assert!(!is_expired(&room, at(0)));
    }
}
