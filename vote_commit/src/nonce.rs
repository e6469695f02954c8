use crate::{Error, MAX_NONCE_LEN, MIN_NONCE_LEN};
use rand_core::{CryptoRng, RngCore};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Single-use random value binding a commitment to one vote attempt.
///
/// The bytes are wiped when the nonce is dropped. `Debug` never prints them.
pub struct Nonce(Zeroizing<Vec<u8>>);

impl Nonce {
    /// Fill a fresh nonce of `len` bytes from a secure generator.
    ///
    /// A generator that cannot produce bytes is a hard failure; there is no fallback.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> Result<Self, Error> {
        check_len(len)?;
        let mut bytes = Zeroizing::new(vec![0u8; len]);
        rng.try_fill_bytes(&mut bytes[..])
            .map_err(Error::EntropyUnavailable)?;
        Ok(Nonce(bytes))
    }

    /// Construct a nonce from raw bytes, e.g. as disclosed by a voter at reveal time.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        check_len(bytes.len())?;
        Ok(Nonce(Zeroizing::new(bytes.to_vec())))
    }

    /// Parse a hex-encoded nonce.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = Zeroizing::new(hex::decode(s)?);
        Self::from_bytes(&bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding, for transmission to the reveal endpoint.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn check_len(len: usize) -> Result<(), Error> {
    if len < MIN_NONCE_LEN || len > MAX_NONCE_LEN {
        return Err(Error::InvalidNonceLength {
            min: MIN_NONCE_LEN,
            max: MAX_NONCE_LEN,
            found: len,
        });
    }
    Ok(())
}

impl PartialEq for Nonce {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.as_bytes().ct_eq(other.as_bytes()))
    }
}

impl Eq for Nonce {}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Nonce(<{} bytes redacted>)", self.len())
    }
}

impl FromStr for Nonce {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nonce::from_hex(s)
    }
}

impl Serialize for Nonce {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        Nonce::from_hex(&s).map_err(de::Error::custom)
    }
}
