use crate::*;
use chrono::Utc;
use digest::Digest;
use sha3::Sha3_256;
use std::convert::TryFrom;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Domain separation tag prepended to every commitment preimage.
const COMMITMENT_DOMAIN: &[u8] = b"vote_commit/commitment/v1";

pub const DIGEST_LENGTH: usize = 32;

/// A hiding, binding commitment to a `VoteChoice`.
///
/// Only the digest and the creation time are carried; the choice and nonce stay with the voter
/// until reveal.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct Commitment {
    #[serde(with = "digest_hex")]
    digest: [u8; DIGEST_LENGTH],

    /// Milliseconds since the unix epoch at which the commitment was made.
    timestamp: u64,
}

// Canonical preimage. Field order is fixed by declaration order.
#[derive(Serialize)]
struct CommitmentPackage<'a> {
    choice: &'a VoteChoice,
    nonce: &'a [u8],
    timestamp: u64,
}

impl Commitment {
    /// Commit to `choice` under `nonce`, stamped with the current wall-clock time.
    pub fn compute(choice: &VoteChoice, nonce: &Nonce) -> Result<Self, Error> {
        Self::compute_at(choice, nonce, now_millis())
    }

    /// Commit to `choice` under `nonce` with an explicit timestamp.
    pub fn compute_at(choice: &VoteChoice, nonce: &Nonce, timestamp: u64) -> Result<Self, Error> {
        let package = CommitmentPackage {
            choice,
            nonce: nonce.as_bytes(),
            timestamp,
        };
        let serialized = Zeroizing::new(serde_cbor::to_vec(&package)?);

        let mut hasher = Sha3_256::new();
        hasher.update(COMMITMENT_DOMAIN);
        hasher.update(serialized.as_slice());

        let mut digest = [0u8; DIGEST_LENGTH];
        digest.copy_from_slice(&hasher.finalize());

        Ok(Commitment { digest, timestamp })
    }

    /// Rebuild a commitment received over the wire.
    pub fn from_hex(digest: &str, timestamp: u64) -> Result<Self, Error> {
        let mut bytes = [0u8; DIGEST_LENGTH];
        hex::decode_to_slice(digest, &mut bytes)?;
        Ok(Commitment {
            digest: bytes,
            timestamp,
        })
    }

    /// Check that `choice` and `nonce` open this commitment.
    ///
    /// Never errors: anything that fails to recompute simply does not match.
    pub fn verify(&self, choice: &VoteChoice, nonce: &Nonce) -> bool {
        match Self::compute_at(choice, nonce, self.timestamp) {
            Ok(recomputed) => recomputed == *self,
            Err(_) => false,
        }
    }

    pub fn digest(&self) -> &[u8; DIGEST_LENGTH] {
        &self.digest
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl PartialEq for Commitment {
    fn eq(&self, other: &Self) -> bool {
        let digest_eq: bool = self.digest.ct_eq(&other.digest).into();
        digest_eq && self.timestamp == other.timestamp
    }
}

impl Eq for Commitment {}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.digest_hex())
    }
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn nonce(byte: u8) -> Nonce {
        Nonce::from_bytes(&[byte; 32]).unwrap()
    }

    #[test]
    fn test_digest_shape() {
        let commitment = Commitment::compute(&VoteChoice::new(7u64, 3u64), &nonce(1)).unwrap();
        let hexed = commitment.digest_hex();
        assert_eq!(hexed.len(), 64);
        assert!(hexed.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(commitment.timestamp() > 0);
    }

    #[test]
    fn test_deterministic_for_same_timestamp() {
        let choice = VoteChoice::new(7u64, 3u64);
        let a = Commitment::compute_at(&choice, &nonce(1), 1_700_000_000_000).unwrap();
        let b = Commitment::compute_at(&choice, &nonce(1), 1_700_000_000_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_timestamp_changes_digest() {
        let choice = VoteChoice::new(7u64, 3u64);
        let a = Commitment::compute_at(&choice, &nonce(1), 1_700_000_000_000).unwrap();
        let b = Commitment::compute_at(&choice, &nonce(1), 1_700_000_000_001).unwrap();
        assert_ne!(a.digest(), b.digest());

        // A commitment only opens at its own timestamp
        let mut moved = a;
        moved.timestamp = b.timestamp();
        assert!(!moved.verify(&choice, &nonce(1)));
    }

    #[test]
    fn test_identifier_kind_changes_digest() {
        let as_int = Commitment::compute_at(&VoteChoice::new(7u64, 3u64), &nonce(1), 1).unwrap();
        let as_str = Commitment::compute_at(&VoteChoice::new(7u64, "3"), &nonce(1), 1).unwrap();
        assert_ne!(as_int, as_str);
    }

    #[test]
    fn test_wrong_nonce() {
        let choice = VoteChoice::new(7u64, 3u64);
        let commitment = Commitment::compute(&choice, &nonce(1)).unwrap();
        assert!(!commitment.verify(&choice, &nonce(2)));
    }

    #[test]
    fn test_no_plaintext_exposed() {
        let choice = VoteChoice::new(7u64, "candidate-zeta");
        let secret = nonce(0x5a);
        let commitment = Commitment::compute(&choice, &secret).unwrap();

        let json = serde_json::to_string(&commitment).unwrap();
        assert!(!json.contains("candidate-zeta"));
        assert!(!json.contains(&secret.to_hex()));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let fields: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(fields, vec!["digest", "timestamp"]);
    }

    #[test]
    fn test_wire_roundtrip() {
        let commitment = Commitment::compute(&VoteChoice::new(1u64, 2u64), &nonce(3)).unwrap();
        let json = serde_json::to_string(&commitment).unwrap();
        let parsed: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, commitment);

        let rebuilt =
            Commitment::from_hex(&commitment.digest_hex(), commitment.timestamp()).unwrap();
        assert_eq!(rebuilt, commitment);
        assert!(Commitment::from_hex("abcd", 0).is_err());
    }

    fn identifier() -> impl Strategy<Value = Identifier> {
        prop_oneof![
            any::<u64>().prop_map(Identifier::Int),
            "[a-z0-9-]{1,16}".prop_map(Identifier::Str),
        ]
    }

    proptest! {
        #[test]
        fn commitment_opens_with_its_own_choice(
            election in identifier(),
            candidate in identifier(),
            nonce_bytes in proptest::collection::vec(any::<u8>(), 16..64),
        ) {
            let choice = VoteChoice::new(election, candidate);
            let nonce = Nonce::from_bytes(&nonce_bytes).unwrap();
            let commitment = Commitment::compute(&choice, &nonce).unwrap();
            prop_assert!(commitment.verify(&choice, &nonce));
        }

        #[test]
        fn commitment_rejects_other_choice(
            election in identifier(),
            candidate in identifier(),
            other in identifier(),
            nonce_bytes in proptest::collection::vec(any::<u8>(), 16..64),
        ) {
            prop_assume!(candidate != other);
            let choice = VoteChoice::new(election.clone(), candidate);
            let other_choice = VoteChoice::new(election, other);
            let nonce = Nonce::from_bytes(&nonce_bytes).unwrap();
            let commitment = Commitment::compute(&choice, &nonce).unwrap();
            prop_assert!(!commitment.verify(&other_choice, &nonce));
        }
    }
}
