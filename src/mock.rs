//! A plaintext-only shadow of the Paillier primitive (§4.G): same contracts
//! as [`crate::EncryptionKey`]/[`crate::DecryptionKey`], but the "ciphertext"
//! slot just holds the plaintext value modulo `n`, so there is no
//! encryption, obfuscation, or modular exponentiation anywhere in this
//! module. Exists for debugging and cross-validating the real primitive in
//! tests; never for production use, which is why construction logs loudly.
//!
//! Mock-ness is a construction-time choice (§9): callers build a
//! [`MockEncryptionKey`]/[`MockDecryptionKey`] instead of the real type, and
//! every call site that is generic over "a Paillier-shaped key" is written
//! against a shared contract rather than branching on a runtime flag.

use rand_core::{CryptoRng, RngCore};
use rug::{Complete, Integer, Rational};

use crate::error::{Error, Result};

/// Mock public key: the modulus `n` only, no generator or `n^2` needed
/// since nothing is ever actually exponentiated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockEncryptionKey {
    n: Integer,
}

impl MockEncryptionKey {
    pub fn from_n(n: Integer) -> Self {
        log::warn!("constructing a MockEncryptionKey: ciphertexts are plaintext, not encrypted");
        Self { n }
    }

    pub fn n(&self) -> &Integer {
        &self.n
    }

    fn check_plaintext(&self, m: &Integer) -> Result<()> {
        if m.cmp0().is_ge() && *m < self.n {
            Ok(())
        } else {
            Err(Error::InvalidArgument("plaintext must be in [0, n)".into()))
        }
    }

    /// Stores `m` unchanged in the "ciphertext" slot.
    pub fn raw_encrypt(&self, m: &Integer, _rng: &mut (impl RngCore + CryptoRng)) -> Result<Integer> {
        self.check_plaintext(m)?;
        Ok(m.clone())
    }

    /// No-op: there is no randomness to refresh.
    pub fn raw_obfuscate(&self, c: &Integer, _rng: &mut (impl RngCore + CryptoRng)) -> Result<Integer> {
        Ok(c.clone())
    }

    pub fn raw_add(&self, c1: &Integer, c2: &Integer) -> Result<Integer> {
        Ok((c1 + c2).complete() % &self.n)
    }

    pub fn raw_multiply(&self, c: &Integer, k: &Integer) -> Result<Integer> {
        Ok((c * k).complete() % &self.n)
    }

    pub fn raw_negate(&self, c: &Integer) -> Result<Integer> {
        if c.cmp0().is_eq() {
            Ok(Integer::from(0))
        } else {
            Ok(Integer::from(&self.n - c))
        }
    }
}

/// Mock private key: holds the same modulus as its key, decryption is the
/// identity function.
#[derive(Clone, Debug)]
pub struct MockDecryptionKey {
    ek: MockEncryptionKey,
}

impl MockDecryptionKey {
    pub fn new(n: Integer) -> Self {
        Self {
            ek: MockEncryptionKey::from_n(n),
        }
    }

    pub fn encryption_key(&self) -> &MockEncryptionKey {
        &self.ek
    }

    pub fn raw_decrypt(&self, c: &Integer) -> Result<Integer> {
        if c.cmp0().is_ge() && *c < self.ek.n {
            Ok(c.clone())
        } else {
            Err(Error::InvalidCiphertext)
        }
    }
}

/// Checks whether a raw plaintext value, interpreted as a signed
/// significand with the given bounds, has overflowed -- the check §4.G
/// requires after every mock add/multiply. Returns `true` (and logs a
/// warning) when the result falls outside `[min_significand,
/// max_significand]` once mapped back through the same `v`/`v - n` rule
/// real encoded numbers use.
pub fn check_overflow(
    result: &Integer,
    n: &Integer,
    max_significand: &Integer,
    min_significand: &Integer,
) -> bool {
    let significand = if result <= max_significand {
        result.clone()
    } else {
        Integer::from(result - n)
    };
    let overflowed = significand > *max_significand || significand < *min_significand;
    if overflowed {
        log::warn!(
            "mock arithmetic result {} overflows the encoding range [{}, {}]",
            significand,
            min_significand,
            max_significand
        );
    }
    overflowed
}

/// Mock encoding context: the same bounds computation as
/// [`crate::EncodingContext`] (§3), bound to a [`MockEncryptionKey`] instead
/// of a real one. Encoding and decoding are ordinary ring arithmetic in both
/// the real and mock worlds (nothing about them is secret), so the bound
/// math here is a direct mirror of the real context's.
#[derive(Clone, Debug)]
pub struct MockEncodingContext {
    public_key: MockEncryptionKey,
    base: u32,
    signed: bool,
    precision: u32,
    max_encoded: Integer,
    min_encoded: Integer,
    max_significand: Integer,
    min_significand: Integer,
}

impl PartialEq for MockEncodingContext {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && self.base == other.base
            && self.signed == other.signed
            && self.precision == other.precision
    }
}
impl Eq for MockEncodingContext {}

impl MockEncodingContext {
    pub fn new(public_key: MockEncryptionKey, base: u32, signed: bool, precision: u32) -> Result<Self> {
        let n_bits = public_key.n().significant_bits();
        if base < 2 {
            return Err(Error::InvalidArgument("base must be >= 2".into()));
        }
        if precision == 0 || precision > n_bits {
            return Err(Error::InvalidArgument(
                "precision must be in 1..=bitlength(n)".into(),
            ));
        }
        if signed && precision < 2 {
            return Err(Error::InvalidArgument(
                "signed contexts require precision >= 2".into(),
            ));
        }

        let enc_space = if precision == n_bits {
            public_key.n().clone()
        } else {
            Integer::from(1) << precision
        };

        let (max_encoded, min_encoded, max_significand, min_significand) = if signed {
            let max_encoded = Integer::from(&enc_space + 1) / 2 - 1;
            let min_encoded = Integer::from(public_key.n() - &max_encoded);
            let max_significand = max_encoded.clone();
            let min_significand = -max_encoded.clone();
            (max_encoded, min_encoded, max_significand, min_significand)
        } else {
            let max_encoded = Integer::from(&enc_space - 1);
            (
                max_encoded.clone(),
                Integer::from(0),
                max_encoded,
                Integer::from(0),
            )
        };

        Ok(Self {
            public_key,
            base,
            signed,
            precision,
            max_encoded,
            min_encoded,
            max_significand,
            min_significand,
        })
    }

    /// A signed, full-precision context with the conventional default base 16.
    pub fn full_precision(public_key: MockEncryptionKey) -> Result<Self> {
        let precision = public_key.n().significant_bits();
        Self::new(public_key, 16, true, precision)
    }

    pub fn public_key(&self) -> &MockEncryptionKey {
        &self.public_key
    }

    pub fn n(&self) -> &Integer {
        self.public_key.n()
    }

    fn rescaling_factor(&self, delta_e: u32) -> Integer {
        crate::encoding::pow_u32(self.base, delta_e)
    }

    fn significand_of(&self, v: &Integer) -> Result<Integer> {
        if *v <= self.max_encoded {
            Ok(v.clone())
        } else if self.signed && *v >= self.min_encoded {
            Ok(Integer::from(v - self.n()))
        } else {
            Err(Error::DecodeOverflow(
                "corrupted significand: value outside the valid encoded range".into(),
            ))
        }
    }

    fn ring_value_of(&self, significand: &Integer) -> Result<Integer> {
        if *significand > self.max_significand || *significand < self.min_significand {
            return Err(Error::EncodeOverflow);
        }
        if significand.cmp0().is_lt() {
            Ok(Integer::from(self.n() + significand))
        } else {
            Ok(significand.clone())
        }
    }

    /// Encodes a signed integer, dividing out trailing factors of `base`
    /// exactly as [`crate::EncodingContext::encode_bigint`] does.
    pub fn encode_i64(&self, k: i64) -> Result<(Integer, i64)> {
        let mut k = Integer::from(k);
        if k.cmp0().is_lt() && !self.signed {
            return Err(Error::EncodeOverflow);
        }
        let base = Integer::from(self.base);
        let mut exponent: i64 = 0;
        if k != 0 {
            let negative = k.cmp0().is_lt();
            let mut magnitude = if negative { Integer::from(-&k) } else { k.clone() };
            loop {
                let (q, r) = magnitude.clone().div_rem_euc(base.clone());
                if r != 0 {
                    break;
                }
                magnitude = q;
                exponent += 1;
            }
            k = if negative { -magnitude } else { magnitude };
        }
        let ring_value = self.ring_value_of(&k)?;
        Ok((ring_value, exponent))
    }

    /// Encodes a double at the same precision-aware exponent
    /// [`crate::EncodingContext::encode_f64`] picks.
    pub fn encode_f64(&self, d: f64) -> Result<(Integer, i64)> {
        if !self.signed && d.is_sign_negative() && d != 0.0 {
            return Err(Error::EncodeOverflow);
        }
        if !d.is_finite() {
            return Err(Error::EncodeOverflow);
        }
        if d == 0.0 {
            return Ok((self.ring_value_of(&Integer::from(0))?, 0));
        }

        let bin_exp = crate::encoding::binary_exponent(d);
        const MANTISSA_BITS: i64 = 53;
        let exponent =
            ((bin_exp + 1 - MANTISSA_BITS) as f64 / (self.base as f64).log2()).floor() as i64;

        let (mantissa, exp2) = crate::encoding::decompose_f64(d);
        let mut numerator = mantissa;
        let mut denominator = Integer::from(1);
        if exp2 >= 0 {
            numerator *= crate::encoding::pow_u32(2, exp2 as u32);
        } else {
            denominator *= crate::encoding::pow_u32(2, (-exp2) as u32);
        }
        if exponent >= 0 {
            denominator *= self.rescaling_factor(exponent as u32);
        } else {
            numerator *= self.rescaling_factor((-exponent) as u32);
        }
        let significand = crate::encoding::round_half_up_ratio(numerator, &denominator);
        Ok((self.ring_value_of(&significand)?, exponent))
    }

    /// Decodes as `f64`: the exact rational `s * B^e`, rounded to the
    /// nearest `f64` in a single step (mirrors
    /// [`crate::encoding::EncodingContext::decode_f64_raw`]).
    pub fn decode_f64(&self, value: &Integer, exponent: i64) -> Result<f64> {
        let significand = self.significand_of(value)?;
        let result = if exponent >= 0 {
            let factor = self.rescaling_factor(exponent as u32);
            (significand * factor).complete().to_f64()
        } else {
            let factor = self.rescaling_factor((-exponent) as u32);
            Rational::from((significand, factor)).to_f64()
        };
        if !result.is_finite() {
            return Err(Error::DecodeOverflow("decoded double is not finite".into()));
        }
        Ok(result)
    }
}

/// Mock counterpart of [`crate::EncryptedNumber`] (§4.G): the "ciphertext"
/// slot holds a plaintext ring value, so `add`/`multiply` are plain modular
/// arithmetic, and both check the result for overflow afterward via
/// [`check_overflow`] -- the one behavior real `EncryptedNumber`s don't
/// (and can't, without decrypting) provide.
#[derive(Clone, Debug, PartialEq)]
pub struct MockEncryptedNumber {
    context: MockEncodingContext,
    value: Integer,
    exponent: i64,
}

impl MockEncryptedNumber {
    pub fn context(&self) -> &MockEncodingContext {
        &self.context
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn value(&self) -> &Integer {
        &self.value
    }

    /// Encrypts (stores) `(value, exponent)` under `context`.
    pub fn encrypt(context: MockEncodingContext, value: Integer, exponent: i64) -> Result<Self> {
        context.public_key().check_plaintext(&value)?;
        Ok(Self {
            context,
            value,
            exponent,
        })
    }

    pub fn decrypt(&self, key: &MockDecryptionKey) -> Result<(Integer, i64)> {
        if key.encryption_key() != &self.context.public_key {
            return Err(Error::KeyMismatch);
        }
        let value = key.raw_decrypt(&self.value)?;
        Ok((value, self.exponent))
    }

    fn check_same_context(&self, other: &Self) -> Result<()> {
        if self.context == other.context {
            Ok(())
        } else {
            Err(Error::ContextMismatch)
        }
    }

    /// Adds two mock ciphertexts, reconciling exponents exactly as
    /// [`crate::EncryptedNumber::add`] does, then checks the result for
    /// overflow (§4.G).
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_same_context(other)?;
        let ek = &self.context.public_key;
        let (v1, e1) = (&self.value, self.exponent);
        let (v2, e2) = (&other.value, other.exponent);

        let (value, exponent) = if e1 == e2 {
            (ek.raw_add(v1, v2)?, e1)
        } else if e1 > e2 {
            let factor = self.context.rescaling_factor((e1 - e2) as u32);
            let rescaled = ek.raw_multiply(v1, &factor)?;
            (ek.raw_add(&rescaled, v2)?, e2)
        } else {
            let factor = self.context.rescaling_factor((e2 - e1) as u32);
            let rescaled = ek.raw_multiply(v2, &factor)?;
            (ek.raw_add(v1, &rescaled)?, e1)
        };

        check_overflow(
            &value,
            self.context.n(),
            &self.context.max_significand,
            &self.context.min_significand,
        );
        Ok(Self {
            context: self.context.clone(),
            value,
            exponent,
        })
    }

    /// Multiplies by a plaintext scalar `(value, exponent)`, then checks the
    /// result for overflow (§4.G).
    pub fn multiply(&self, scalar_value: &Integer, scalar_exponent: i64) -> Result<Self> {
        let ek = &self.context.public_key;
        let value = ek.raw_multiply(&self.value, scalar_value)?;
        check_overflow(
            &value,
            self.context.n(),
            &self.context.max_significand,
            &self.context.min_significand,
        );
        Ok(Self {
            context: self.context.clone(),
            value,
            exponent: self.exponent + scalar_exponent,
        })
    }
}
