use std::{fmt, str::FromStr};

use serde::{
    de::{Error as DeError, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::errors::PublicKeyParseError;

/// The uncompressed public key a validator registers for signing
/// checkpoints. The service treats it as opaque bytes; the matching signer
/// address is registered alongside it.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SignerPublicKey(pub [u8; SignerPublicKey::SIZE]);

impl SignerPublicKey {
    pub const SIZE: usize = 64;

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_hex(hex_str: &str) -> Result<SignerPublicKey, PublicKeyParseError> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);

        if hex_str.len() != SignerPublicKey::SIZE * 2 {
            return Err(PublicKeyParseError::WrongLength);
        }

        let mut bytes = [0u8; SignerPublicKey::SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        Ok(SignerPublicKey(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl Default for SignerPublicKey {
    fn default() -> Self {
        SignerPublicKey([0u8; SignerPublicKey::SIZE])
    }
}

impl From<[u8; SignerPublicKey::SIZE]> for SignerPublicKey {
    fn from(bytes: [u8; SignerPublicKey::SIZE]) -> Self {
        SignerPublicKey(bytes)
    }
}

impl fmt::Display for SignerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SignerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The full key is 128 hex characters; keep debug output short.
        write!(f, "SignerPublicKey(0x{}…)", hex::encode(&self.0[..8]))
    }
}

impl FromStr for SignerPublicKey {
    type Err = PublicKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignerPublicKey::from_hex(s)
    }
}

impl Serialize for SignerPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for SignerPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s: String = Deserialize::deserialize(deserializer)?;
            SignerPublicKey::from_hex(&s).map_err(DeError::custom)
        } else {
            deserializer.deserialize_bytes(SignerPublicKeyVisitor)
        }
    }
}

struct SignerPublicKeyVisitor;

impl<'de> Visitor<'de> for SignerPublicKeyVisitor {
    type Value = SignerPublicKey;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a {}-byte public key", SignerPublicKey::SIZE)
    }

    fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Self::Value, E> {
        let bytes: [u8; SignerPublicKey::SIZE] = v
            .try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))?;
        Ok(SignerPublicKey(bytes))
    }
}
