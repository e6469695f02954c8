//! One voter's commit/reveal lifecycle for one election.
//!
//! ```text
//! Idle --commit--> Committed --reveal--> Revealed
//!   \                  |
//!    `----abort--------+-----> Aborted
//! ```
//!
//! Secrets (the selection and the nonce) never leave the session except through the
//! [`Reveal`] handed back once the vote is disclosed.

use crate::*;
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use std::fmt;
use tracing::{debug, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Committed,
    Revealed,
    Aborted,
}

impl Phase {
    /// Revealed and Aborted sessions accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Revealed | Phase::Aborted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Committed => "committed",
            Phase::Revealed => "revealed",
            Phase::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

enum State {
    Idle {
        selection: Option<VoteChoice>,
    },
    Committed {
        selection: VoteChoice,
        nonce: Nonce,
        commitment: Commitment,
    },
    Revealed {
        commitment: Commitment,
    },
    Aborted,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Idle { .. } => Phase::Idle,
            State::Committed { .. } => Phase::Committed,
            State::Revealed { .. } => Phase::Revealed,
            State::Aborted => Phase::Aborted,
        }
    }

    fn commitment(&self) -> Option<&Commitment> {
        match self {
            State::Committed { commitment, .. } | State::Revealed { commitment } => {
                Some(commitment)
            }
            _ => None,
        }
    }
}

/// Everything the reveal endpoint needs.
///
/// The nonce is moved out of the session; it is wiped once this value is dropped.
#[derive(Debug)]
pub struct Reveal {
    pub commitment: Commitment,
    pub payload: EncryptedPayload,
    pub nonce: Nonce,
}

/// A single ballot attempt.
///
/// Hold exactly one session per voter and election. Every operation checks the current
/// phase, so a repeated or out-of-order call is rejected here rather than by the caller.
pub struct VoteSession<R = OsRng> {
    election_id: Identifier,
    engine: CommitmentEngine<R>,
    state: State,
}

impl VoteSession<OsRng> {
    /// Open a ballot for `election_id`, using the operating system's entropy source.
    pub fn new(election_id: impl Into<Identifier>) -> Self {
        Self::with_engine(election_id, CommitmentEngine::new())
    }

    pub fn with_config(election_id: impl Into<Identifier>, config: Config) -> Self {
        Self::with_engine(election_id, CommitmentEngine::with_config(config))
    }
}

impl<R: RngCore + CryptoRng> VoteSession<R> {
    pub fn with_engine(election_id: impl Into<Identifier>, engine: CommitmentEngine<R>) -> Self {
        VoteSession {
            election_id: election_id.into(),
            engine,
            state: State::Idle { selection: None },
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn election_id(&self) -> &Identifier {
        &self.election_id
    }

    /// The commitment made by this session, once there is one.
    pub fn commitment(&self) -> Option<&Commitment> {
        self.state.commitment()
    }

    pub fn has_selection(&self) -> bool {
        matches!(
            self.state,
            State::Idle {
                selection: Some(_)
            } | State::Committed { .. }
        )
    }

    /// Choose (or change) the candidate. Only possible before committing.
    pub fn select_candidate(&mut self, choice: VoteChoice) -> Result<(), Error> {
        if choice.election_id() != &self.election_id {
            return Err(Error::InvalidTransition {
                operation: "select a candidate from another election",
                phase: self.phase(),
            });
        }
        if let State::Idle { selection } = &mut self.state {
            *selection = Some(choice);
            return Ok(());
        }
        Err(self.invalid("select a candidate"))
    }

    /// Commit to the current selection under a fresh nonce.
    ///
    /// The returned commitment is safe to send to the server; it discloses nothing about the
    /// selection.
    pub fn commit(&mut self) -> Result<Commitment, Error> {
        let selection = match &self.state {
            State::Idle {
                selection: Some(selection),
            } => selection.clone(),
            State::Idle { selection: None } => return Err(Error::NoSelection),
            _ => return Err(self.invalid("commit")),
        };

        let nonce = match self.engine.generate_nonce() {
            Ok(nonce) => nonce,
            Err(e) => {
                if let Error::EntropyUnavailable(_) = e {
                    self.abort();
                }
                return Err(e);
            }
        };
        let commitment = self.engine.compute_commitment(&selection, &nonce)?;

        self.state = State::Committed {
            selection,
            nonce,
            commitment,
        };
        debug!(
            election = %self.election_id,
            commitment = %commitment,
            timestamp = commitment.timestamp(),
            "vote committed"
        );

        Ok(commitment)
    }

    /// Disclose the committed vote, encrypted under `key`.
    ///
    /// The commitment is re-checked against the held selection and nonce first; a mismatch
    /// means the session state is corrupt and the session is aborted.
    pub fn reveal(&mut self, key: &SessionKey) -> Result<Reveal, Error> {
        let (selection, nonce, commitment) =
            match std::mem::replace(&mut self.state, State::Aborted) {
                State::Committed {
                    selection,
                    nonce,
                    commitment,
                } => (selection, nonce, commitment),
                other => {
                    let phase = other.phase();
                    self.state = other;
                    return Err(match phase {
                        Phase::Idle => Error::NotCommitted,
                        phase => Error::InvalidTransition {
                            operation: "reveal",
                            phase,
                        },
                    });
                }
            };

        if !self
            .engine
            .verify_commitment(&commitment, &selection, &nonce)
        {
            warn!(
                election = %self.election_id,
                "held vote no longer matches its commitment, aborting"
            );
            return Err(Error::CommitmentMismatch);
        }

        match self.engine.encrypt_reveal(&selection, key) {
            Ok(payload) => {
                self.state = State::Revealed { commitment };
                debug!(election = %self.election_id, commitment = %commitment, "vote revealed");
                Ok(Reveal {
                    commitment,
                    payload,
                    nonce,
                })
            }
            Err(e @ Error::EntropyUnavailable(_)) => {
                warn!(election = %self.election_id, "entropy unavailable during reveal, aborting");
                Err(e)
            }
            Err(e) => {
                self.state = State::Committed {
                    selection,
                    nonce,
                    commitment,
                };
                Err(e)
            }
        }
    }

    /// Abandon the attempt, discarding the selection, nonce and commitment.
    ///
    /// Does nothing once the session has finished.
    pub fn abort(&mut self) {
        if self.phase().is_terminal() {
            return;
        }
        let from = self.phase();
        self.state = State::Aborted;
        debug!(election = %self.election_id, from = %from, "vote session aborted");
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidTransition {
            operation,
            phase: self.phase(),
        }
    }

    #[cfg(test)]
    fn corrupt_selection(&mut self, choice: VoteChoice) {
        if let State::Committed { selection, .. } = &mut self.state {
            *selection = choice;
        }
    }
}

impl<R> fmt::Debug for VoteSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VoteSession")
            .field("election_id", &self.election_id)
            .field("phase", &self.state.phase())
            .field("commitment", &self.state.commitment())
            .finish()
    }
}
