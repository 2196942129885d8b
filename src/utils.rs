use rand_core::RngCore;
use rug::{Assign, Complete, Integer};

use crate::error::{Error, Result};

/// Wraps any randomness source that implements [`rand_core::RngCore`] and makes
/// it compatible with [`rug::rand`].
pub fn external_rand(rng: &mut impl RngCore) -> rug::rand::ThreadRandState<'_> {
    use bytemuck::TransparentWrapper;

    #[derive(TransparentWrapper)]
    #[repr(transparent)]
    pub struct ExternalRand<R>(R);

    impl<R: RngCore> rug::rand::ThreadRandGen for ExternalRand<R> {
        fn gen(&mut self) -> u32 {
            self.0.next_u32()
        }
    }

    rug::rand::ThreadRandState::new_custom(ExternalRand::wrap_mut(rng))
}

/// Checks that `x` is in Z*_n (non-negative and coprime with `n`).
#[inline(always)]
pub fn in_mult_group(x: &Integer, n: &Integer) -> bool {
    x.cmp0().is_ge() && in_mult_group_abs(x, n)
}

/// Checks that `abs(x)` is coprime with `n`.
#[inline(always)]
pub fn in_mult_group_abs(x: &Integer, n: &Integer) -> bool {
    x.gcd_ref(n).complete() == *Integer::ONE
}

/// Samples `x` uniformly from `Z*_n`.
pub fn sample_in_mult_group(rng: &mut impl RngCore, n: &Integer) -> Integer {
    let mut rng = external_rand(rng);
    let mut x = Integer::new();
    loop {
        x.assign(n.random_below_ref(&mut rng));
        if in_mult_group(&x, n) {
            return x;
        }
    }
}

/// Samples a probable prime of exactly `bits` bits (top bit set), using a
/// cryptographically secure RNG. This is the BigInt adapter's
/// `probablePrime`: no safe-prime structure is imposed, just primality and
/// bit length.
pub fn generate_prime(rng: &mut impl RngCore, bits: u32) -> Integer {
    use rug::integer::IsPrime;
    let mut rng = external_rand(rng);
    let mut x = Integer::new();
    loop {
        x.assign(Integer::random_bits(bits, &mut rng));
        x.set_bit(bits - 1, true);
        x.set_bit(0, true);

        if let IsPrime::Yes | IsPrime::Probably = x.is_probably_prime(25) {
            return x;
        }
    }
}

/// Samples a random safe prime (`p` with `(p-1)/2` also prime) of `bits`
/// bits. Offered as an opt-in hardened alternative to [`generate_prime`];
/// see `DecryptionKey::generate_with_safe_primes`.
pub fn generate_safe_prime(rng: &mut impl RngCore, bits: u32) -> Integer {
    use rug::integer::IsPrime;
    let mut rng = external_rand(rng);
    let mut x = Integer::new();
    loop {
        x.assign(Integer::random_bits(bits - 1, &mut rng));
        x.set_bit(bits - 2, true);
        x <<= 1;
        x += 1;

        if let IsPrime::Yes | IsPrime::Probably = x.is_probably_prime(25) {
            return x;
        }
    }
}

/// `floor(sqrt(x))` for non-negative `x`, via GMP's integer square root.
pub fn isqrt(x: &Integer) -> Integer {
    x.clone().sqrt()
}

/// `true` iff `x` is a perfect square (checked by squaring `isqrt(x)` back).
pub fn is_perfect_square(x: &Integer) -> bool {
    if x.cmp0().is_lt() {
        return false;
    }
    let r = isqrt(x);
    (&r * &r).complete() == *x
}

/// Modular exponentiation with a non-secret exponent (BigInt adapter's `modPow`).
pub fn mod_pow(base: &Integer, exponent: &Integer, modulus: &Integer) -> Result<Integer> {
    base.pow_mod_ref(exponent, modulus)
        .map(Integer::from)
        .ok_or_else(|| {
            Error::InvalidArgument("modular exponentiation undefined for given inputs".into())
        })
}

/// Modular exponentiation with a constant-time-enough routine (BigInt
/// adapter's `modPowSecure`), used for every exponent this crate treats as
/// secret: obfuscation nonces, scalar multiplication, and decryption.
///
/// Backed by GMP's `mpz_powm_sec`, which requires an odd modulus; `n` and
/// `n^2` are always odd here since they are products of odd primes.
pub fn mod_pow_secure(base: &Integer, exponent: &Integer, modulus: &Integer) -> Result<Integer> {
    base.secure_pow_mod_ref(exponent, modulus)
        .map(Integer::from)
        .ok_or_else(|| {
            Error::InvalidArgument(
                "secure modular exponentiation undefined for given inputs".into(),
            )
        })
}

/// Modular inverse (BigInt adapter's `modInverse`).
pub fn mod_inverse(x: &Integer, modulus: &Integer) -> Result<Integer> {
    x.clone()
        .invert(modulus)
        .map_err(|_| Error::InvalidArgument("value has no inverse modulo the given modulus".into()))
}

/// Provides functionality that's yet missing in [`rug::Integer`].
pub trait IntegerExt {
    /// Returns `self mod module`, always non-negative.
    fn modulo(&self, module: &Self) -> Self;
}

impl IntegerExt for Integer {
    fn modulo(&self, module: &Self) -> Self {
        let c = (self % module).complete();
        if c.cmp0().is_lt() {
            module + c
        } else {
            c
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isqrt_exact() {
        let x = Integer::from(144);
        assert_eq!(isqrt(&x), Integer::from(12));
        assert!(is_perfect_square(&x));
    }

    #[test]
    fn isqrt_floor() {
        let x = Integer::from(150);
        assert_eq!(isqrt(&x), Integer::from(12));
        assert!(!is_perfect_square(&x));
    }

    #[test]
    fn mod_pow_matches_mod_pow_secure() {
        let base = Integer::from(7);
        let exp = Integer::from(13);
        let m = Integer::from(101);
        assert_eq!(
            mod_pow(&base, &exp, &m).unwrap(),
            mod_pow_secure(&base, &exp, &m).unwrap()
        );
    }
}
