use std::sync::Arc;

use rug::{Complete, Integer};

use crate::encoding::EncodingContext;
use crate::error::{Error, Result};

/// A signed rational `s * B^e`, carried as a ring value `v ∈ [0, n)` (§3):
/// `v` directly when `v <= maxEncoded`, or `v - n` when `v` falls in the
/// negative range `[minEncoded, n)` of a signed context.
///
/// Immutable: every method that conceptually "changes" a value returns a
/// new `EncodedNumber` sharing the same [`EncodingContext`].
#[derive(Clone, Debug)]
pub struct EncodedNumber {
    context: Arc<EncodingContext>,
    value: Integer,
    exponent: i64,
}

impl PartialEq for EncodedNumber {
    fn eq(&self, other: &Self) -> bool {
        self.context == other.context && self.value == other.value && self.exponent == other.exponent
    }
}
impl Eq for EncodedNumber {}

impl EncodedNumber {
    pub(crate) fn new(context: Arc<EncodingContext>, value: Integer, exponent: i64) -> Self {
        Self {
            context,
            value,
            exponent,
        }
    }

    pub fn context(&self) -> &Arc<EncodingContext> {
        &self.context
    }

    /// The raw ring value `v ∈ [0, n)`.
    pub fn value(&self) -> &Integer {
        &self.value
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub(crate) fn check_same_context(&self, other: &Self) -> Result<()> {
        if self.context == other.context {
            Ok(())
        } else {
            Err(Error::ContextMismatch)
        }
    }

    /// Recovers the signed significand `s` (§3).
    pub fn significand(&self) -> Result<Integer> {
        self.context.significand_of(&self.value)
    }

    /// Decodes as an arbitrary-precision integer: `s * B^e`. Returns
    /// `(value, lossy)`; `lossy` is true when `e < 0` and `B^-e` did not
    /// divide `s` exactly, in which case the caller should surface the
    /// lossy-decode warning (§7) via its own diagnostic channel, e.g.
    /// `log::warn!`.
    pub fn decode_bigint_lossy(&self) -> Result<(Integer, bool)> {
        self.context.decode_bigint_raw(&self.value, self.exponent)
    }

    /// Decodes as an arbitrary-precision integer, requiring an exact result.
    pub fn decode_bigint(&self) -> Result<Integer> {
        let (value, lossy) = self.decode_bigint_lossy()?;
        if lossy {
            log::warn!("lossy integer decode: exponent {} does not evenly divide the significand", self.exponent);
        }
        Ok(value)
    }

    /// Decodes as `f64`.
    pub fn decode_f64(&self) -> Result<f64> {
        self.context.decode_f64_raw(&self.value, self.exponent)
    }

    /// Decodes as `i64`, failing with `DecodeOverflow` if the exact integer
    /// value doesn't fit.
    pub fn decode_i64(&self) -> Result<i64> {
        let value = self.decode_bigint()?;
        value
            .to_i64()
            .ok_or_else(|| Error::DecodeOverflow("decoded integer does not fit in i64".into()))
    }

    /// Additive inverse, exponent preserved (§4.F): `n - v` for nonzero `v`,
    /// `v` unchanged when it is already zero.
    pub fn additive_inverse(&self) -> Self {
        let value = if self.value == 0 {
            Integer::from(0)
        } else {
            Integer::from(self.context.n() - &self.value)
        };
        Self {
            context: Arc::clone(&self.context),
            value,
            exponent: self.exponent,
        }
    }

    /// `self + other`, reconciling differing exponents the same way
    /// [`crate::EncryptedNumber::add`] does for ciphertexts, but via plain
    /// modular addition instead of `raw_add` (§4.F "Add EncodedNumber +
    /// EncodedNumber" -- the natural counterpart the base spec left
    /// implicit, needed internally when aligning two plaintext-side
    /// operands). Result exponent is `min(e1, e2)`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_same_context(other)?;
        let n = self.context.n();
        let (v1, e1) = (&self.value, self.exponent);
        let (v2, e2) = (&other.value, other.exponent);

        let (value, exponent) = if e1 == e2 {
            ((v1 + v2).complete() % n, e1)
        } else if e1 > e2 {
            let factor = self.context.rescaling_factor((e1 - e2) as u32);
            let rescaled = (v1 * factor).complete() % n;
            ((rescaled + v2).complete() % n, e2)
        } else {
            let factor = self.context.rescaling_factor((e2 - e1) as u32);
            let rescaled = (v2 * factor).complete() % n;
            ((v1 + rescaled).complete() % n, e1)
        };

        Ok(Self {
            context: Arc::clone(&self.context),
            value,
            exponent,
        })
    }

    /// `self * other`: `value = v1*v2 mod n`, `exponent = e1+e2` (§4.F
    /// "Multiply EncodedNumber × EncodedNumber").
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        self.check_same_context(other)?;
        let value = (&self.value * &other.value).complete() % self.context.n();
        Ok(Self {
            context: Arc::clone(&self.context),
            value,
            exponent: self.exponent + other.exponent,
        })
    }

    /// Lowers the exponent to `target` (must be `<= exponent`), rescaling
    /// the ring value by `B^(exponent-target)` (§4.F `decreaseExponentTo`).
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
        let value = (&self.value * factor).complete() % self.context.n();
        Ok(Self {
            context: Arc::clone(&self.context),
            value,
            exponent: target,
        })
    }
}
