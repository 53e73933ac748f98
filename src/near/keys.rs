//! ed25519 access keys in NEAR's text form (`ed25519:<base58>`).

use crate::error::{Error, Result};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const ED25519_PREFIX: &str = "ed25519:";

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ED25519_PREFIX, bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    /// Accepts `ed25519:<base58>` or a bare base58 string.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_key_data(s)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::Key(format!("public key must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Function-call access key generated for a sign-in.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self { signing: SigningKey::generate(&mut OsRng) }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self { signing: SigningKey::from_bytes(seed) }
    }

    pub fn public_key(&self) -> PublicKey {
        let verifying: VerifyingKey = self.signing.verifying_key();
        PublicKey(verifying.to_bytes())
    }

    /// `ed25519:<base58 of seed ‖ public key>`, the near-api-js secret format.
    pub fn secret_key(&self) -> String {
        format!(
            "{}{}",
            ED25519_PREFIX,
            bs58::encode(self.signing.to_keypair_bytes()).into_string()
        )
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.signing.to_bytes() == other.signing.to_bytes()
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public_key", &self.public_key()).finish()
    }
}

impl FromStr for KeyPair {
    type Err = Error;

    /// Parses the 64-byte secret format, or a bare 32-byte seed.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_key_data(s)?;
        match bytes.len() {
            64 => {
                let mut buf = [0u8; 64];
                buf.copy_from_slice(&bytes);
                let signing = SigningKey::from_keypair_bytes(&buf)
                    .map_err(|e| Error::Key(format!("secret key does not match public half: {e}")))?;
                Ok(Self { signing })
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                Ok(Self::from_seed(&seed))
            }
            n => Err(Error::Key(format!("secret key must be 32 or 64 bytes, got {n}"))),
        }
    }
}

fn decode_key_data(s: &str) -> Result<Vec<u8>> {
    let data = match s.split_once(':') {
        Some(("ed25519", data)) => data,
        Some((curve, _)) => return Err(Error::Key(format!("unsupported key type {curve:?}"))),
        None => s,
    };
    bs58::decode(data)
        .into_vec()
        .map_err(|e| Error::Key(format!("base58: {e}")))
}
