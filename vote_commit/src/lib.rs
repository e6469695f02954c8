//! Commit/reveal voting.
//!
//! A voter first publishes a [`Commitment`] to their choice, binding it under a secret
//! [`Nonce`] without disclosing it. Later the choice is revealed, encrypted for the server,
//! together with the nonce so the server can check it against the earlier commitment.
//! [`VoteSession`] drives one voter through that lifecycle; [`CommitmentEngine`] holds the
//! primitives.

#[macro_use]
extern crate serde;

mod choice;
mod commitment;
mod config;
mod encryption;
mod engine;
mod error;
mod nonce;
mod serde_hex;
mod session;

pub use choice::*;
pub use commitment::*;
pub use config::*;
pub use encryption::{EncryptedPayload, SessionKey, IV_LENGTH, KEY_LENGTH, TAG_LENGTH};
pub use engine::*;
pub use error::*;
pub use nonce::*;
pub use serde_hex::*;
pub use session::*;
