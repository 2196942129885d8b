//! Paillier partially homomorphic encryption (the PAI-GN1 variant, `g = n+1`)
//! with a fixed-point significand/exponent encoding layer on top, so callers
//! work with signed integers and doubles instead of raw ring elements.
//!
//! The three layers are [`EncryptionKey`]/[`DecryptionKey`] (the raw
//! primitive), [`EncodingContext`]/[`EncodedNumber`] (the encoding), and
//! [`EncryptedNumber`] (ciphertexts bound to a context, with the
//! homomorphic `add`/`multiply` glue that reconciles exponents between
//! operands). [`mock`] provides a plaintext-only stand-in for debugging.

mod decryption_key;
mod encoding;
mod encrypted;
mod encryption_key;
mod error;
pub mod mock;
mod number;
pub mod utils;

#[cfg(feature = "serde")]
mod serde;
#[cfg(feature = "serde")]
pub mod jwk;

pub use self::{
    decryption_key::DecryptionKey,
    encoding::EncodingContext,
    encrypted::EncryptedNumber,
    encryption_key::EncryptionKey,
    error::{Error, Result},
    number::EncodedNumber,
};
