//! Authenticated encryption of revealed votes.
//!
//! Votes are sealed with AES-256-GCM under a per-election session key. The IV is 96 bits and
//! freshly drawn for every encryption; the 128-bit tag travels detached next to the ciphertext.

use crate::*;
use aes_gcm::aead::{generic_array::GenericArray, AeadInPlace, NewAead};
use aes_gcm::Aes256Gcm;
use hkdf::Hkdf;
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

pub const KEY_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 12;
pub const TAG_LENGTH: usize = 16;

/// Associated data bound into every reveal ciphertext.
const REVEAL_DOMAIN: &[u8] = b"vote_commit/reveal/v1";

/// Symmetric key used to transport-encrypt a revealed vote.
///
/// Any byte string is accepted here; a key that is not 256 bits is rejected when it is used.
#[derive(Clone)]
pub struct SessionKey(Zeroizing<Vec<u8>>);

impl SessionKey {
    /// Generate a fresh 256-bit key from the operating system.
    pub fn generate() -> Result<Self, Error> {
        Self::generate_with(&mut rand::rngs::OsRng {})
    }

    /// Generate a fresh 256-bit key from the given secure generator.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, Error> {
        let mut key = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        rng.try_fill_bytes(&mut key[..])
            .map_err(Error::EntropyUnavailable)?;
        Ok(SessionKey(key))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        SessionKey(Zeroizing::new(bytes.to_vec()))
    }

    /// Expand shared key material into a session key with HKDF-SHA256.
    ///
    /// `context` separates keys derived from the same material, e.g. per election.
    pub fn derive(secret: &[u8], context: &[u8]) -> Result<Self, Error> {
        let h = Hkdf::<Sha256>::new(None, secret);
        let mut key = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        h.expand(context, &mut key[..])
            .map_err(|_| Error::EncryptionFailure)?;
        Ok(SessionKey(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn cipher(&self) -> Option<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.as_bytes()).ok()
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SessionKey(<{} bytes redacted>)", self.0.len())
    }
}

/// A revealed vote, encrypted for the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    #[serde(with = "hex_serde")]
    pub ciphertext: Vec<u8>,

    #[serde(with = "hex_serde")]
    pub iv: Vec<u8>,

    #[serde(with = "hex_serde")]
    pub tag: Vec<u8>,
}

pub(crate) fn aes_encrypt<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &SessionKey,
    choice: &VoteChoice,
) -> Result<EncryptedPayload, Error> {
    let aead = key.cipher().ok_or(Error::EncryptionFailure)?;

    let mut iv = [0u8; IV_LENGTH];
    rng.try_fill_bytes(&mut iv)
        .map_err(Error::EntropyUnavailable)?;

    let mut buffer = serde_cbor::to_vec(choice)?;
    let tag = aead
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), REVEAL_DOMAIN, &mut buffer[..])
        .map_err(|_| Error::EncryptionFailure)?;

    Ok(EncryptedPayload {
        ciphertext: buffer,
        iv: iv.to_vec(),
        tag: tag.to_vec(),
    })
}

pub(crate) fn aes_decrypt(
    key: &SessionKey,
    payload: &EncryptedPayload,
) -> Result<VoteChoice, Error> {
    // A key of the wrong size can never have produced this payload.
    let aead = key.cipher().ok_or(Error::AuthenticationFailure)?;

    if payload.iv.len() != IV_LENGTH || payload.tag.len() != TAG_LENGTH {
        return Err(Error::AuthenticationFailure);
    }

    let mut buffer = Zeroizing::new(payload.ciphertext.clone());
    aead.decrypt_in_place_detached(
        GenericArray::from_slice(&payload.iv),
        REVEAL_DOMAIN,
        &mut buffer[..],
        GenericArray::from_slice(&payload.tag),
    )
    .map_err(|_| Error::AuthenticationFailure)?;

    Ok(serde_cbor::from_slice(&buffer)?)
}
