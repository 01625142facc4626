use std::{fmt, str::FromStr};

use serde::{
    de::{Error as DeError, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::errors::AddressParseError;

/// A 20-byte account address, displayed and parsed as `0x`-prefixed hex.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address(pub [u8; Address::SIZE]);

impl Address {
    pub const SIZE: usize = 20;

    /// The all-zero address. Slot mints and burns are logged as transfers
    /// from and to this address.
    pub const ZERO: Address = Address([0x00; Address::SIZE]);

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_hex(hex_str: &str) -> Result<Address, AddressParseError> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);

        if hex_str.len() != Address::SIZE * 2 {
            return Err(AddressParseError::WrongLength);
        }

        let mut bytes = [0u8; Address::SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        Ok(Address(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; Address::SIZE]> for Address {
    fn from(bytes: [u8; Address::SIZE]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s: String = Deserialize::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(DeError::custom)
        } else {
            deserializer.deserialize_bytes(AddressVisitor)
        }
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a {}-byte address", Address::SIZE)
    }

    fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Self::Value, E> {
        let bytes: [u8; Address::SIZE] = v
            .try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))?;
        Ok(Address(bytes))
    }
}
