use crate::encryption::{aes_decrypt, aes_encrypt};
use crate::*;
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use tracing::warn;

/// Builds and checks vote commitments and seals revealed votes.
///
/// The engine keeps no state between calls besides its entropy source, which must be a
/// cryptographically secure generator. Sessions own their own engine.
#[derive(Debug, Clone)]
pub struct CommitmentEngine<R = OsRng> {
    rng: R,
    config: Config,
}

impl CommitmentEngine<OsRng> {
    /// An engine drawing from the operating system's entropy source.
    pub fn new() -> Self {
        Self::with_rng(OsRng {}, Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_rng(OsRng {}, config)
    }
}

impl Default for CommitmentEngine<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> CommitmentEngine<R> {
    pub fn with_rng(rng: R, config: Config) -> Self {
        CommitmentEngine { rng, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Draw a fresh nonce of the configured length.
    pub fn generate_nonce(&mut self) -> Result<Nonce, Error> {
        Nonce::generate(&mut self.rng, self.config.nonce_len).map_err(|e| {
            warn!(error = %e, "nonce generation failed");
            e
        })
    }

    /// Commit to `choice` under `nonce`, stamped with the current time.
    pub fn compute_commitment(
        &self,
        choice: &VoteChoice,
        nonce: &Nonce,
    ) -> Result<Commitment, Error> {
        Commitment::compute(choice, nonce)
    }

    /// Check that `choice` and `nonce` open `commitment`.
    pub fn verify_commitment(
        &self,
        commitment: &Commitment,
        choice: &VoteChoice,
        nonce: &Nonce,
    ) -> bool {
        commitment.verify(choice, nonce)
    }

    /// Encrypt a revealed choice for the server under a fresh IV.
    pub fn encrypt_reveal(
        &mut self,
        choice: &VoteChoice,
        key: &SessionKey,
    ) -> Result<EncryptedPayload, Error> {
        aes_encrypt(&mut self.rng, key, choice)
    }

    /// Decrypt a revealed choice, failing closed if the payload does not authenticate.
    pub fn decrypt_reveal(
        &self,
        payload: &EncryptedPayload,
        key: &SessionKey,
    ) -> Result<VoteChoice, Error> {
        aes_decrypt(key, payload)
    }

    /// Check a reveal the way the receiving server does.
    ///
    /// The payload is decrypted and the disclosed nonce must open `commitment` for the
    /// decrypted choice.
    pub fn open_reveal(
        &self,
        commitment: &Commitment,
        payload: &EncryptedPayload,
        nonce: &Nonce,
        key: &SessionKey,
    ) -> Result<VoteChoice, Error> {
        let choice = self.decrypt_reveal(payload, key)?;
        if !self.verify_commitment(commitment, &choice, nonce) {
            warn!(commitment = %commitment, "revealed vote does not open its commitment");
            return Err(Error::CommitmentMismatch);
        }
        Ok(choice)
    }
}

/// Generate a nonce of the default length from the operating system.
pub fn generate_nonce() -> Result<Nonce, Error> {
    CommitmentEngine::new().generate_nonce()
}

/// Commit to `choice` under `nonce`, stamped with the current time.
pub fn compute_commitment(choice: &VoteChoice, nonce: &Nonce) -> Result<Commitment, Error> {
    Commitment::compute(choice, nonce)
}

pub fn verify_commitment(commitment: &Commitment, choice: &VoteChoice, nonce: &Nonce) -> bool {
    commitment.verify(choice, nonce)
}

/// Encrypt a revealed choice under `key`.
pub fn encrypt_reveal(choice: &VoteChoice, key: &SessionKey) -> Result<EncryptedPayload, Error> {
    CommitmentEngine::new().encrypt_reveal(choice, key)
}

/// Decrypt a revealed choice, failing closed if the payload does not authenticate.
pub fn decrypt_reveal(payload: &EncryptedPayload, key: &SessionKey) -> Result<VoteChoice, Error> {
    aes_decrypt(key, payload)
}

/// Check a reveal against its earlier commitment. See [`CommitmentEngine::open_reveal`].
pub fn open_reveal(
    commitment: &Commitment,
    payload: &EncryptedPayload,
    nonce: &Nonce,
    key: &SessionKey,
) -> Result<VoteChoice, Error> {
    CommitmentEngine::new().open_reveal(commitment, payload, nonce, key)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::HashSet;

    /// A generator whose entropy source is gone.
    pub(crate) struct NoEntropy;

    impl RngCore for NoEntropy {
        fn next_u32(&mut self) -> u32 {
            panic!("no entropy")
        }

        fn next_u64(&mut self) -> u64 {
            panic!("no entropy")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("no entropy")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "entropy source unavailable",
            )))
        }
    }

    impl CryptoRng for NoEntropy {}

    #[test]
    fn test_nonces_are_unique() {
        let mut engine = CommitmentEngine::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let nonce = engine.generate_nonce().unwrap();
            assert_eq!(nonce.len(), 32);
            assert!(seen.insert(nonce.to_hex()));
        }
        assert_ne!(generate_nonce().unwrap(), generate_nonce().unwrap());
    }

    #[test]
    fn test_configured_nonce_len() {
        let mut engine = CommitmentEngine::with_config(Config::new(16).unwrap());
        assert_eq!(engine.generate_nonce().unwrap().len(), 16);
    }

    #[test]
    fn test_entropy_unavailable() {
        let mut engine = CommitmentEngine::with_rng(NoEntropy, Config::default());
        assert!(matches!(
            engine.generate_nonce(),
            Err(Error::EntropyUnavailable(_))
        ));

        let key = SessionKey::from_bytes(&[1; 32]);
        assert!(matches!(
            engine.encrypt_reveal(&VoteChoice::new(1u64, 2u64), &key),
            Err(Error::EntropyUnavailable(_))
        ));
        assert!(matches!(
            SessionKey::generate_with(&mut NoEntropy),
            Err(Error::EntropyUnavailable(_))
        ));
    }

    #[test]
    fn test_seeded_engine() {
        let config = Config::default();
        let mut a = CommitmentEngine::with_rng(ChaCha20Rng::seed_from_u64(42), config);
        let mut b = CommitmentEngine::with_rng(ChaCha20Rng::seed_from_u64(42), config);
        assert_eq!(a.generate_nonce().unwrap(), b.generate_nonce().unwrap());
        assert_ne!(a.generate_nonce().unwrap(), a.generate_nonce().unwrap());
    }

    #[test]
    fn test_free_functions() {
        let choice = VoteChoice::new("election-7", "candidate-3");
        let nonce = generate_nonce().unwrap();
        let commitment = compute_commitment(&choice, &nonce).unwrap();
        assert!(verify_commitment(&commitment, &choice, &nonce));

        let key = SessionKey::generate().unwrap();
        let payload = encrypt_reveal(&choice, &key).unwrap();
        assert_eq!(decrypt_reveal(&payload, &key).unwrap(), choice);
    }

    #[test]
    fn test_open_reveal() {
        let mut engine = CommitmentEngine::new();
        let choice = VoteChoice::new(7u64, 3u64);
        let nonce = engine.generate_nonce().unwrap();
        let commitment = engine.compute_commitment(&choice, &nonce).unwrap();
        let key = SessionKey::generate().unwrap();
        let payload = engine.encrypt_reveal(&choice, &key).unwrap();

        assert_eq!(
            open_reveal(&commitment, &payload, &nonce, &key).unwrap(),
            choice
        );

        // Switching the vote after committing is caught
        let switched = engine
            .encrypt_reveal(&VoteChoice::new(7u64, 4u64), &key)
            .unwrap();
        assert!(matches!(
            engine.open_reveal(&commitment, &switched, &nonce, &key),
            Err(Error::CommitmentMismatch)
        ));

        // So is a different nonce
        let other_nonce = engine.generate_nonce().unwrap();
        assert!(matches!(
            engine.open_reveal(&commitment, &payload, &other_nonce, &key),
            Err(Error::CommitmentMismatch)
        ));

        // And a tampered payload never reaches the commitment check
        let mut tampered = payload.clone();
        tampered.tag[0] ^= 1;
        assert!(matches!(
            engine.open_reveal(&commitment, &tampered, &nonce, &key),
            Err(Error::AuthenticationFailure)
        ));
    }
}
