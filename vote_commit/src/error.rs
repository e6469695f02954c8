use crate::Phase;
use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("vote_commit: no secure entropy source available: {0}")]
    EntropyUnavailable(#[source] rand::Error),

    #[error("vote_commit: cannot {operation} while session is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("vote_commit: no candidate selected")]
    NoSelection,

    #[error("vote_commit: no commitment has been made")]
    NotCommitted,

    #[error("vote_commit: commitment does not match the revealed vote")]
    CommitmentMismatch,

    #[error("vote_commit: failed to encrypt vote")]
    EncryptionFailure,

    #[error("vote_commit: vote payload failed authentication")]
    AuthenticationFailure,

    #[error("vote_commit: invalid nonce - expected {min} to {max} bytes, found {found}")]
    InvalidNonceLength {
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("vote_commit: invalid hexidecimal: {0}")]
    BadHex(#[from] hex::FromHexError),

    #[error("vote_commit: CBOR error: {0}")]
    CborSerialization(#[from] serde_cbor::Error),

    #[error("vote_commit: invalid configuration: {0}")]
    InvalidConfig(String),
}
