use rand_core::{CryptoRng, RngCore};
use rug::{Complete, Integer};

use crate::error::{Error, Result};
use crate::utils;

/// Paillier public key: modulus `n`, its square `n^2`, and the fixed
/// generator `g = n+1` of the PAI-GN1 variant.
///
/// Identity is determined solely by `n` (§3): two keys with the same
/// modulus are the same key even if constructed independently.
#[derive(Clone, Debug)]
pub struct EncryptionKey {
    n: Integer,
    nn: Integer,
    g: Integer,
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n
    }
}
impl Eq for EncryptionKey {}

impl EncryptionKey {
    /// Constructs an encryption key from `n`. `n^2` and `g = n+1` are
    /// derived eagerly since every encryption and homomorphic op needs them.
    pub fn from_n(n: Integer) -> Self {
        let nn = (&n * &n).complete();
        let g = Integer::from(&n + 1);
        Self { n, nn, g }
    }

    /// Returns `n`.
    pub fn n(&self) -> &Integer {
        &self.n
    }

    /// Returns `n^2`.
    pub fn nn(&self) -> &Integer {
        &self.nn
    }

    /// Returns the generator `g = n + 1`.
    pub fn g(&self) -> &Integer {
        &self.g
    }

    /// `c ∈ [0, n^2)`, i.e. a syntactically valid ciphertext slot.
    pub fn is_valid_ciphertext(&self, c: &Integer) -> bool {
        c.cmp0().is_ge() && *c < self.nn
    }

    fn check_ciphertext(&self, c: &Integer) -> Result<()> {
        if self.is_valid_ciphertext(c) {
            Ok(())
        } else {
            Err(Error::InvalidCiphertext)
        }
    }

    fn check_plaintext(&self, m: &Integer) -> Result<()> {
        if m.cmp0().is_ge() && *m < self.n {
            Ok(())
        } else {
            Err(Error::InvalidArgument("plaintext must be in [0, n)".into()))
        }
    }

    /// `raw_encrypt_without_obfuscation(m) = (1 + m*n) mod n^2`.
    ///
    /// Valid because `g = n+1` and `(1+n)^m ≡ 1 + m*n (mod n^2)`; this
    /// avoids a modular exponentiation entirely. The returned ciphertext is
    /// deterministic in `m` and must be obfuscated with [`Self::raw_obfuscate`]
    /// before it is safe to expose.
    pub fn raw_encrypt_without_obfuscation(&self, m: &Integer) -> Result<Integer> {
        self.check_plaintext(m)?;
        let a = (Integer::ONE + (m * &self.n).complete()) % &self.nn;
        Ok(a)
    }

    /// Re-randomizes `c` by multiplying in `r^n mod n^2` for a fresh random
    /// `r` sampled from `Z*_n`. Preserves the encrypted plaintext.
    pub fn raw_obfuscate(
        &self,
        c: &Integer,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Integer> {
        self.check_ciphertext(c)?;
        let r = utils::sample_in_mult_group(rng, &self.n);
        let rn = utils::mod_pow_secure(&r, &self.n, &self.nn)?;
        Ok((c * rn).complete() % &self.nn)
    }

    /// Encrypts `m` with fresh randomness: encrypt-without-obfuscation then
    /// obfuscate in one step.
    pub fn raw_encrypt(&self, m: &Integer, rng: &mut (impl RngCore + CryptoRng)) -> Result<Integer> {
        let c = self.raw_encrypt_without_obfuscation(m)?;
        self.raw_obfuscate(&c, rng)
    }

    /// `raw_add(c1, c2) = c1 * c2 mod n^2`, i.e. `Enc(m1 + m2 mod n)`.
    pub fn raw_add(&self, c1: &Integer, c2: &Integer) -> Result<Integer> {
        self.check_ciphertext(c1)?;
        self.check_ciphertext(c2)?;
        Ok((c1 * c2).complete() % &self.nn)
    }

    /// `raw_multiply(c, k) = c^k mod n^2`, i.e. `Enc(k*m mod n)`, for a
    /// plaintext scalar `k ∈ [0, n)`. Always routed through `modPowSecure`
    /// since `k` may be secret.
    pub fn raw_multiply(&self, c: &Integer, k: &Integer) -> Result<Integer> {
        self.check_ciphertext(c)?;
        self.check_plaintext(k)?;
        utils::mod_pow_secure(c, k, &self.nn)
    }

    /// `raw_negate(c) = c^-1 mod n^2`, i.e. `Enc(-m mod n)`.
    pub fn raw_negate(&self, c: &Integer) -> Result<Integer> {
        self.check_ciphertext(c)?;
        utils::mod_inverse(c, &self.nn)
    }
}
