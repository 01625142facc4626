use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AddressParseError {
    #[error("Wrong length")]
    WrongLength,
    #[error("Invalid hex encoding")]
    InvalidHex,
}

impl From<hex::FromHexError> for AddressParseError {
    fn from(_: hex::FromHexError) -> Self {
        AddressParseError::InvalidHex
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum PublicKeyParseError {
    #[error("Wrong length")]
    WrongLength,
    #[error("Invalid hex encoding")]
    InvalidHex,
}

impl From<hex::FromHexError> for PublicKeyParseError {
    fn from(_: hex::FromHexError) -> Self {
        PublicKeyParseError::InvalidHex
    }
}
