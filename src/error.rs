use thiserror::Error;

/// Every failure mode this crate can produce, shared by the primitive,
/// encoding, and homomorphic-arithmetic layers. Kept as a single flat enum
/// (rather than the upstream crate's opaque `Error(Reason)` wrapper) because
/// callers are expected to match on the *kind* of failure -- exponent
/// reconciliation across mismatched contexts, or decryption under the wrong
/// key, are expected, recoverable conditions in multi-party protocols, not
/// just a display string.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A value fell outside `[minSignificand, maxSignificand]`, was
    /// NaN/infinite, or was negative under an unsigned context.
    #[error("value cannot be encoded in this context: out of range")]
    EncodeOverflow,

    /// A decoded ring value or exact result fell outside its valid range.
    #[error("decoded value out of range: {0}")]
    DecodeOverflow(String),

    /// Two operands of a binary operation belong to different encoding
    /// contexts (public key, signedness, precision, or base differ).
    #[error("operands belong to different encoding contexts")]
    ContextMismatch,

    /// A ciphertext was decrypted with a private key whose public key
    /// does not match the ciphertext's.
    #[error("ciphertext was not produced under this key")]
    KeyMismatch,

    /// A structural precondition failed: key size not a positive multiple
    /// of 8, non-positive base, precision outside `1..=bitlength(n)`,
    /// rescaling to a larger exponent, or invalid (p, q).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A ciphertext was not a member of `[0, n^2)`.
    #[error("ciphertext is not a member of Z_(n^2)")]
    InvalidCiphertext,
}

pub type Result<T> = std::result::Result<T, Error>;
