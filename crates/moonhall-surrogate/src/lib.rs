//! Computer-controlled participants.
//!
//! For every action a surrogate must supply — guard target, wolf vote,
//! inspection, witch choice, day vote, speech, last words, revenge —
//! the [`SurrogateActor`] first asks the text-completion collaborator,
//! parses the reply against the legal target set, and falls back to a
//! rule-respecting random choice when the reply is empty, unparsable,
//! or illegal. Collaborator failures never reach players.
//!
//! # Key types
//!
//! - [`TextCompletion`] — the collaborator seam
//! - [`HttpCompletion`] — OpenAI-style chat-completions client
//! - [`SurrogateActor`] — the decision maker
//! - [`CollaboratorError`] — completion failures (always recovered)

mod actor;
mod completion;
mod error;

pub use actor::{
    SurrogateActor, fallback_guard_target, fallback_vote_target, fallback_wolf_target,
};
pub use completion::{HttpCompletion, TextCompletion};
pub use error::CollaboratorError;
