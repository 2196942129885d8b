use std::sync::Arc;

use rand_core::{CryptoRng, RngCore};
use rug::{Complete, Integer};

use crate::encoding::EncodingContext;
use crate::error::{Error, Result};
use crate::number::EncodedNumber;
use crate::DecryptionKey;

/// A Paillier ciphertext paired with the exponent and [`EncodingContext`] of
/// the [`EncodedNumber`] it encrypts (§3).
///
/// `is_safe` tracks whether the ciphertext has been obfuscated with fresh
/// randomness since its last arithmetic op; any accessor that exposes the
/// raw ciphertext (serialization, [`Self::ciphertext`]) must obfuscate first
/// if it is not (§4.E).
#[derive(Clone, Debug)]
pub struct EncryptedNumber {
    context: Arc<EncodingContext>,
    ciphertext: Integer,
    exponent: i64,
    is_safe: bool,
}

impl EncryptedNumber {
    pub(crate) fn new(context: Arc<EncodingContext>, ciphertext: Integer, exponent: i64, is_safe: bool) -> Self {
        Self {
            context,
            ciphertext,
            exponent,
            is_safe,
        }
    }

    /// Reconstructs an `EncryptedNumber` from its raw parts (e.g. decoded
    /// off the wire format of §6). The ciphertext is assumed not-yet-safe,
    /// since nothing here vouches for its obfuscation history; any path
    /// that later serializes it will re-obfuscate.
    pub fn from_parts(context: Arc<EncodingContext>, ciphertext: Integer, exponent: i64) -> Result<Self> {
        if !context.public_key().is_valid_ciphertext(&ciphertext) {
            return Err(Error::InvalidCiphertext);
        }
        Ok(Self {
            context,
            ciphertext,
            exponent,
            is_safe: false,
        })
    }

    pub fn context(&self) -> &Arc<EncodingContext> {
        &self.context
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_safe(&self) -> bool {
        self.is_safe
    }

    fn check_same_context(&self, other: &Self) -> Result<()> {
        if self.context == other.context {
            Ok(())
        } else {
            Err(Error::ContextMismatch)
        }
    }

    fn check_same_context_encoded(&self, other: &EncodedNumber) -> Result<()> {
        if self.context == *other.context() {
            Ok(())
        } else {
            Err(Error::ContextMismatch)
        }
    }

    /// The raw ciphertext value, obfuscating first if it was not already
    /// safe to expose (§4.E).
    pub fn ciphertext(&self, rng: &mut (impl RngCore + CryptoRng)) -> Result<Integer> {
        if self.is_safe {
            Ok(self.ciphertext.clone())
        } else {
            Ok(self.obfuscate(rng)?.ciphertext)
        }
    }

    /// The raw ciphertext value without obfuscating, for callers that have
    /// already established it is safe to expose (e.g. right after
    /// [`Self::obfuscate`], or when re-obfuscation is the caller's job).
    pub fn ciphertext_unchecked(&self) -> &Integer {
        &self.ciphertext
    }

    /// Re-randomizes the ciphertext, preserving its plaintext.
    pub fn obfuscate(&self, rng: &mut (impl RngCore + CryptoRng)) -> Result<Self> {
        let ciphertext = self.context.public_key().raw_obfuscate(&self.ciphertext, rng)?;
        Ok(Self {
            context: Arc::clone(&self.context),
            ciphertext,
            exponent: self.exponent,
            is_safe: true,
        })
    }

    /// Encrypts an [`EncodedNumber`] under its own context's public key.
    pub fn encrypt(encoded: &EncodedNumber, rng: &mut (impl RngCore + CryptoRng)) -> Result<Self> {
        let context = Arc::clone(encoded.context());
        let ciphertext = context.public_key().raw_encrypt(encoded.value(), rng)?;
        Ok(Self {
            context,
            ciphertext,
            exponent: encoded.exponent(),
            is_safe: true,
        })
    }

    /// Decrypts with `key`, preserving the exponent (§4.E). Fails with
    /// `KeyMismatch` if `key`'s public key doesn't match this ciphertext's.
    pub fn decrypt(&self, key: &DecryptionKey) -> Result<EncodedNumber> {
        if key.encryption_key() != self.context.public_key() {
            return Err(Error::KeyMismatch);
        }
        let value = key.raw_decrypt(&self.ciphertext)?;
        Ok(EncodedNumber::new(Arc::clone(&self.context), value, self.exponent))
    }

    /// Additive inverse: `modInverse(c, n^2)`, exponent preserved (§4.F).
    pub fn additive_inverse(&self) -> Result<Self> {
        let ciphertext = self.context.public_key().raw_negate(&self.ciphertext)?;
        Ok(Self {
            context: Arc::clone(&self.context),
            ciphertext,
            exponent: self.exponent,
            is_safe: self.is_safe,
        })
    }

    /// Lowers the exponent to `target` (`<= exponent`) via
    /// `raw_multiply(c, B^(exponent-target))` (§4.F `decreaseExponentTo`).
    pub fn decrease_exponent_to(&self, target: i64) -> Result<Self> {
        if target > self.exponent {
            return Err(Error::InvalidArgument(
                "decreaseExponentTo requires target <= current exponent".into(),
            ));
        }
        if target == self.exponent {
            return Ok(self.clone());
        }
        let delta = (self.exponent - target) as u32;
        let factor = self.context.rescaling_factor(delta);
        let ek = self.context.public_key();
        let ciphertext = ek.raw_multiply(&self.ciphertext, &factor)?;
        Ok(Self {
            context: Arc::clone(&self.context),
            ciphertext,
            exponent: target,
            // Rescaling is itself a modular exponentiation with a
            // non-secret-looking but public factor; it does not add fresh
            // randomness, so safety is unaffected.
            is_safe: self.is_safe,
        })
    }

    /// Adds two ciphertexts, reconciling differing exponents by rescaling
    /// the larger-exponent side down via `raw_multiply` (§4.F "Add two
    /// EncryptedNumbers"). Result exponent is `min(e1, e2)`;
    /// `is_safe = is_safe1 && is_safe2`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_same_context(other)?;
        let ek = self.context.public_key();
        let (c1, e1, safe1) = (&self.ciphertext, self.exponent, self.is_safe);
        let (c2, e2, safe2) = (&other.ciphertext, other.exponent, other.is_safe);

        let (ciphertext, exponent) = if e1 == e2 {
            (ek.raw_add(c1, c2)?, e1)
        } else if e1 > e2 {
            let factor = self.context.rescaling_factor((e1 - e2) as u32);
            let rescaled = ek.raw_multiply(c1, &factor)?;
            (ek.raw_add(&rescaled, c2)?, e2)
        } else {
            let factor = self.context.rescaling_factor((e2 - e1) as u32);
            let rescaled = ek.raw_multiply(c2, &factor)?;
            (ek.raw_add(c1, &rescaled)?, e1)
        };

        Ok(Self {
            context: Arc::clone(&self.context),
            ciphertext,
            exponent,
            is_safe: safe1 && safe2,
        })
    }

    /// Adds an [`EncodedNumber`] to this ciphertext (§4.F "Add EncryptedNumber
    /// + EncodedNumber"). Re-expressing `(v, e)` at a smaller target exponent
    /// is always a cheap, exact modular multiply by `B^(e-target)` (the same
    /// direction [`EncodedNumber::decrease_exponent_to`] allows); re-expressing
    /// it at a *larger* exponent would require dividing the significand,
    /// which is lossy in general. So:
    ///
    /// - if the encoded exponent is larger than the ciphertext's, decrease it
    ///   down to the ciphertext's exponent via a modular multiply (cheap)
    ///   rather than rescaling the ciphertext itself (a modular
    ///   exponentiation);
    /// - otherwise (encoded exponent equal to or smaller than the
    ///   ciphertext's) there is no cheap encoded-side rescale available;
    ///   encrypt the encoded operand at its own exponent and delegate to
    ///   [`Self::add`], which rescales the ciphertext side instead.
    pub fn add_encoded(&self, other: &EncodedNumber, rng: &mut (impl RngCore + CryptoRng)) -> Result<Self> {
        self.check_same_context_encoded(other)?;
        let n = self.context.n();

        if other.exponent() > self.exponent {
            // Decrease the encoded value's exponent down to this
            // ciphertext's. May overflow the modulus; uncaught by design
            // (§4.F note).
            let delta = (other.exponent() - self.exponent) as u32;
            let factor = self.context.rescaling_factor(delta);
            let scaled_value = (other.value() * factor).complete() % n;
            let scaled = EncodedNumber::new(Arc::clone(&self.context), scaled_value, self.exponent);
            let encrypted = Self::encrypt(&scaled, rng)?;
            return self.add(&encrypted);
        }

        // Exponents equal, or the encoded exponent is smaller: encrypt at
        // the encoded operand's own exponent and let ciphertext+ciphertext
        // addition reconcile exponents, rescaling the ciphertext side via
        // raw_multiply.
        let encrypted = Self::encrypt(other, rng)?;
        self.add(&encrypted)
    }

    /// Multiplies this ciphertext by a plaintext scalar (§4.F "Multiply
    /// EncryptedNumber × EncodedNumber"). Exponent of the result is
    /// `exponent + scalar.exponent()`; `is_safe` carries over from `self`
    /// unchanged (the product reveals no more randomness than `self`
    /// already did, but callers that serialize the result should still
    /// obfuscate first).
    pub fn multiply(&self, scalar: &EncodedNumber) -> Result<Self> {
        self.check_same_context_encoded(scalar)?;
        let ek = self.context.public_key();
        let n = self.context.n();
        let k = scalar.value();

        // "Large negative" optimization: a signed significand stored as
        // `n - |k|` with `|k|` small is cheaper to apply via
        // `modInverse(c, n^2)^(n-k)`, since `n-k` there is the small `|k|`
        // rather than the large ring representative of a negative number.
        let large_negative = Integer::from(n - k) <= *self.context.max_significand();
        let ciphertext = if large_negative {
            let inv = ek.raw_negate(&self.ciphertext)?;
            let small_exponent = Integer::from(n - k);
            ek.raw_multiply(&inv, &small_exponent)?
        } else {
            ek.raw_multiply(&self.ciphertext, k)?
        };

        Ok(Self {
            context: Arc::clone(&self.context),
            ciphertext,
            exponent: self.exponent + scalar.exponent(),
            is_safe: self.is_safe,
        })
    }
}
