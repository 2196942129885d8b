use std::sync::Arc;

use rug::{Complete, Integer, Rational};

use crate::error::{Error, Result};
use crate::number::EncodedNumber;
use crate::EncryptionKey;

/// `base^exponent`, computed by square-and-multiply. `rug::Integer` has no
/// inherent small-integer power of this shape, so this is the BigInt
/// adapter's `pow` built directly on `mul`+`complete`.
pub(crate) fn pow_u32(base: u32, exponent: u32) -> Integer {
    let mut result = Integer::from(1);
    let mut b = Integer::from(base);
    let mut e = exponent;
    while e > 0 {
        if e & 1 == 1 {
            result = (&result * &b).complete();
        }
        if e > 1 {
            b = (&b * &b).complete();
        }
        e >>= 1;
    }
    result
}

/// Rounds the (possibly negative) rational `num/den` (`den > 0`) to the
/// nearest integer, breaking exact ties away from zero -- the "round half
/// up" §4.D calls for.
pub(crate) fn round_half_up_ratio(num: Integer, den: &Integer) -> Integer {
    let neg = num.cmp0().is_lt();
    let num = if neg { -num } else { num };
    let (q, r) = num.div_rem_euc(den.clone());
    let twice_r = Integer::from(&r * 2);
    let q = if twice_r >= *den { q + 1 } else { q };
    if neg {
        -q
    } else {
        q
    }
}

/// Exact decomposition of a finite, nonzero `f64` into `mantissa * 2^exp2`
/// (mantissa signed, including the implicit leading bit for normal values).
pub(crate) fn decompose_f64(d: f64) -> (Integer, i32) {
    let bits = d.to_bits();
    let sign: i64 = if (bits >> 63) & 1 == 1 { -1 } else { 1 };
    let biased_exp = ((bits >> 52) & 0x7ff) as i32;
    let mantissa_bits = bits & 0xf_ffff_ffff_ffff;
    if biased_exp == 0 {
        // Subnormal: no implicit leading bit, fixed exponent.
        (Integer::from(sign * mantissa_bits as i64), -1074)
    } else {
        let mantissa = mantissa_bits | (1 << 52);
        let exp2 = biased_exp - 1075;
        (Integer::from(sign * mantissa as i64), exp2)
    }
}

/// `floor(log2(|d|))` for finite nonzero `d`, read directly off the IEEE-754
/// exponent field rather than via a lossy `f64::log2`.
pub(crate) fn binary_exponent(d: f64) -> i64 {
    let bits = d.to_bits();
    let biased_exp = ((bits >> 52) & 0x7ff) as i64;
    if biased_exp == 0 {
        // Subnormal; magnitude is tiny enough that a float estimate suffices.
        d.abs().log2().floor() as i64
    } else {
        biased_exp - 1023
    }
}

/// Immutable configuration bound to a public key: the base `B` significands
/// are expressed in, whether negative values are representable, and how
/// much of the ring `Z/nZ` is given over to the encoding (`precision` bits).
///
/// Two contexts are equal iff they share a public key, signedness, precision
/// and base (§4.E `checkSameContext`); binary ops between values of unequal
/// contexts fail with [`Error::ContextMismatch`].
#[derive(Clone, Debug)]
pub struct EncodingContext {
    public_key: EncryptionKey,
    base: u32,
    signed: bool,
    precision: u32,
    max_encoded: Integer,
    min_encoded: Integer,
    max_significand: Integer,
    min_significand: Integer,
}

impl PartialEq for EncodingContext {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && self.base == other.base
            && self.signed == other.signed
            && self.precision == other.precision
    }
}
impl Eq for EncodingContext {}

impl EncodingContext {
    /// Builds a context over `public_key` with the given `base` (`>= 2`),
    /// `signed`ness and `precision` in bits (`1..=bitlength(n)`, and `>= 2`
    /// when `signed`).
    pub fn new(public_key: EncryptionKey, base: u32, signed: bool, precision: u32) -> Result<Self> {
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

    /// A signed, full-precision (`precision = bitlength(n)`) context with
    /// the conventional default base 16. The shape every CLI subcommand
    /// (§6) and most callers use.
    pub fn full_precision(public_key: EncryptionKey) -> Result<Self> {
        let precision = public_key.n().significant_bits();
        Self::new(public_key, 16, true, precision)
    }

    pub fn public_key(&self) -> &EncryptionKey {
        &self.public_key
    }

    pub fn n(&self) -> &Integer {
        self.public_key.n()
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn max_significand(&self) -> &Integer {
        &self.max_significand
    }

    pub fn min_significand(&self) -> &Integer {
        &self.min_significand
    }

    /// `B^delta_e`, the factor an encoded value is multiplied by when its
    /// exponent decreases by `delta_e` (§4.D "Rescaling").
    pub(crate) fn rescaling_factor(&self, delta_e: u32) -> Integer {
        pow_u32(self.base, delta_e)
    }

    /// Recovers the signed significand from a ring value `v` (§3
    /// EncodedNumber: `v` if `v <= maxEncoded`, `v - n` if `v >= minEncoded`,
    /// else corrupted).
    pub(crate) fn significand_of(&self, v: &Integer) -> Result<Integer> {
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

    /// Maps a signed significand back into `[0, n)` ring form (negative
    /// values become `n - |value|`).
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

    fn encoded(self: &Arc<Self>, value: Integer, exponent: i64) -> EncodedNumber {
        EncodedNumber::new(Arc::clone(self), value, exponent)
    }

    /// Encodes an arbitrary-precision integer, dividing out trailing factors
    /// of `base` to find the smallest-magnitude (largest-exponent)
    /// representation (§4.D `encode(integer k)`).
    pub fn encode_bigint(self: &Arc<Self>, mut k: Integer) -> Result<EncodedNumber> {
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
        Ok(self.encoded(ring_value, exponent))
    }

    /// Encodes a machine integer via [`Self::encode_bigint`].
    pub fn encode_i64(self: &Arc<Self>, k: i64) -> Result<EncodedNumber> {
        self.encode_bigint(Integer::from(k))
    }

    /// `innerEncode(x, e) = round_half_up(x * B^-e)`, reduced into ring form.
    fn inner_encode_f64(self: &Arc<Self>, x: f64, exponent: i64) -> Result<EncodedNumber> {
        if !x.is_finite() {
            return Err(Error::EncodeOverflow);
        }
        if x == 0.0 {
            let ring_value = self.ring_value_of(&Integer::from(0))?;
            return Ok(self.encoded(ring_value, exponent));
        }

        let (mantissa, exp2) = decompose_f64(x);
        // x * B^-e = mantissa * 2^exp2 * B^-e; fold every positive-sign
        // exponent into the numerator and every negative-sign one into the
        // denominator so the ratio stays exact.
        let mut numerator = mantissa;
        let mut denominator = Integer::from(1);
        if exp2 >= 0 {
            numerator *= pow_u32(2, exp2 as u32);
        } else {
            denominator *= pow_u32(2, (-exp2) as u32);
        }
        if exponent >= 0 {
            denominator *= self.rescaling_factor(exponent as u32);
        } else {
            numerator *= self.rescaling_factor((-exponent) as u32);
        }

        let significand = round_half_up_ratio(numerator, &denominator);
        let ring_value = self.ring_value_of(&significand)?;
        Ok(self.encoded(ring_value, exponent))
    }

    /// Encodes a double at the precision-aware exponent
    /// `e = floor((binaryExp(d) + 1 - 53) / log2(B))` (§4.D `encode(double d)`).
    pub fn encode_f64(self: &Arc<Self>, d: f64) -> Result<EncodedNumber> {
        if !self.signed && d.is_sign_negative() && d != 0.0 {
            return Err(Error::EncodeOverflow);
        }
        let exponent = self.natural_f64_exponent(d)?;
        self.inner_encode_f64(d, exponent)
    }

    /// Like [`Self::encode_f64`], but caps the chosen exponent at
    /// `max_exponent` (§4.D `encode(double d, int maxExponent)`).
    pub fn encode_f64_with_max_exponent(
        self: &Arc<Self>,
        d: f64,
        max_exponent: i64,
    ) -> Result<EncodedNumber> {
        if !self.signed && d.is_sign_negative() && d != 0.0 {
            return Err(Error::EncodeOverflow);
        }
        let exponent = self.natural_f64_exponent(d)?.min(max_exponent);
        self.inner_encode_f64(d, exponent)
    }

    /// Encodes a double at the exponent implied by a relative `precision`
    /// in `(0, 1]`: `e = floor(log(precision) / log(B))`
    /// (§4.D `encode(double d, double precision)`).
    pub fn encode_f64_with_precision(self: &Arc<Self>, d: f64, precision: f64) -> Result<EncodedNumber> {
        if !(precision > 0.0 && precision <= 1.0) {
            return Err(Error::InvalidArgument("precision must be in (0, 1]".into()));
        }
        if !self.signed && d.is_sign_negative() && d != 0.0 {
            return Err(Error::EncodeOverflow);
        }
        let exponent = (precision.ln() / (self.base as f64).ln()).floor() as i64;
        self.inner_encode_f64(d, exponent)
    }

    /// The "natural" exponent for `d`: the binary exponent of its least
    /// significant mantissa bit, translated into base-`B` digits.
    fn natural_f64_exponent(&self, d: f64) -> Result<i64> {
        if !d.is_finite() {
            return Err(Error::EncodeOverflow);
        }
        if d == 0.0 {
            return Ok(0);
        }
        let bin_exp = binary_exponent(d);
        const MANTISSA_BITS: i64 = 53;
        let e = (bin_exp + 1 - MANTISSA_BITS) as f64 / (self.base as f64).log2();
        Ok(e.floor() as i64)
    }

    /// Decodes the exact integer value `s * B^e`. Lossy when `e < 0` and
    /// `B^-e` does not divide `s`: the true quotient is returned (rounded
    /// toward zero) and the caller is expected to have surfaced the lossy
    /// decode warning (§7) via [`EncodedNumber::decode_bigint`].
    pub(crate) fn decode_bigint_raw(&self, value: &Integer, exponent: i64) -> Result<(Integer, bool)> {
        let significand = self.significand_of(value)?;
        if exponent >= 0 {
            let factor = self.rescaling_factor(exponent as u32);
            Ok(((significand * factor).complete(), false))
        } else {
            let factor = self.rescaling_factor((-exponent) as u32);
            let negative = significand.cmp0().is_lt();
            let magnitude = if negative { -significand } else { significand };
            let (q, r) = magnitude.div_rem_euc(factor);
            let q = if negative { -q } else { q };
            Ok((q, r != 0))
        }
    }

    /// Decodes as `f64` by computing the exact rational `s * B^e` and
    /// rounding to the nearest `f64` in a single step (§4.D `decodeDouble`).
    /// The negative-exponent case builds `s / B^-e` as a [`Rational`] rather
    /// than dividing two independently-rounded `f64`s, which would round
    /// twice and lose precision `to_f64()` on the plain division wouldn't.
    pub(crate) fn decode_f64_raw(&self, value: &Integer, exponent: i64) -> Result<f64> {
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
