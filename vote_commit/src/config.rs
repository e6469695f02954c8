use crate::Error;
use std::env::{var, VarError};

/// Smallest nonce accepted, in bytes (128 bits).
pub const MIN_NONCE_LEN: usize = 16;

/// Nonce length used when nothing else is configured, in bytes (256 bits).
pub const DEFAULT_NONCE_LEN: usize = 32;

/// Largest nonce accepted, in bytes.
pub const MAX_NONCE_LEN: usize = 1024;

/// Environment variable overriding the nonce length.
pub const NONCE_LEN_VAR: &str = "VOTE_COMMIT_NONCE_LEN";

/// Protocol parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of random bytes in every commitment nonce.
    pub nonce_len: usize,
}

impl Config {
    /// Create a config with the given nonce length, which must lie between 128 bits and
    /// `MAX_NONCE_LEN` bytes.
    pub fn new(nonce_len: usize) -> Result<Self, Error> {
        if nonce_len < MIN_NONCE_LEN || nonce_len > MAX_NONCE_LEN {
            return Err(Error::InvalidConfig(format!(
                "nonce length must be between {} and {} bytes, got {}",
                MIN_NONCE_LEN, MAX_NONCE_LEN, nonce_len
            )));
        }
        Ok(Config { nonce_len })
    }

    /// Read the config from the environment.
    ///
    /// `VOTE_COMMIT_NONCE_LEN` overrides the nonce length; when unset the default is used.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_var(var(NONCE_LEN_VAR))
    }

    fn from_var(val: Result<String, VarError>) -> Result<Self, Error> {
        match val {
            Ok(val) => Self::parse_nonce_len(&val),
            Err(VarError::NotPresent) => Ok(Config::default()),
            Err(VarError::NotUnicode(_)) => Err(Error::InvalidConfig(format!(
                "{} is not valid unicode",
                NONCE_LEN_VAR
            ))),
        }
    }

    fn parse_nonce_len(val: &str) -> Result<Self, Error> {
        let nonce_len = val.trim().parse::<usize>().map_err(|e| {
            Error::InvalidConfig(format!("{} is not a valid length: {}", NONCE_LEN_VAR, e))
        })?;
        Config::new(nonce_len)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nonce_len: DEFAULT_NONCE_LEN,
        }
    }
}
