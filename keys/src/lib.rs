mod address;
mod errors;
mod public_key;

pub use self::{
    address::Address,
    errors::{AddressParseError, PublicKeyParseError},
    public_key::SignerPublicKey,
};
