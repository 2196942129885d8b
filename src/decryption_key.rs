mod crt;

use rand_core::{CryptoRng, RngCore};
use rug::{Complete, Integer};

use self::crt::FastPowN;
use crate::error::{Error, Result};
use crate::utils;
use crate::EncryptionKey;

/// `L(x, m) = (x-1)/m`. Callers must ensure `x ≡ 1 (mod m)`, which Fermat's
/// little theorem guarantees for every `x` this module passes in (e.g.
/// `g^(p-1) mod p^2 ≡ 1 (mod p)`); this is `(x-1)/m` in exact integer
/// division, never a checked one.
fn l(x: &Integer, m: &Integer) -> Integer {
    (x - Integer::ONE).complete() / m
}

/// Paillier private key. Always carries the prime factorization `p, q` and
/// their CRT precomputations (§3, §9 "Totient-only private keys..."): even
/// when constructed from the totient form used by the JSON wire format
/// (§6), the factors are recovered once here so every other operation can
/// assume them.
#[derive(Clone)]
pub struct DecryptionKey {
    ek: EncryptionKey,
    p: Integer,
    q: Integer,
    p_squared: Integer,
    q_squared: Integer,
    /// `p^-1 mod q`
    p_inv_mod_q: Integer,
    /// `L(g^(p-1) mod p^2, p)^-1 mod p`
    hp: Integer,
    /// `L(g^(q-1) mod q^2, q)^-1 mod q`
    hq: Integer,
    /// `(p-1)(q-1)`
    lambda: Integer,
    /// `lambda^-1 mod n`
    mu: Integer,
    fast_pow_n: FastPowN,
}

impl DecryptionKey {
    /// Generates a paillier key of `bit_length` bits (`p`, `q` each
    /// `bit_length/2` bits). Fails with `InvalidArgument` if `bit_length` is
    /// not a positive multiple of 8.
    pub fn generate(rng: &mut (impl RngCore + CryptoRng), bit_length: u32) -> Result<Self> {
        if bit_length == 0 || bit_length % 8 != 0 {
            return Err(Error::InvalidArgument(
                "key size must be a positive multiple of 8".into(),
            ));
        }
        let half = bit_length / 2;
        loop {
            let p = utils::generate_prime(rng, half);
            let q = utils::generate_prime(rng, half);
            if p == q {
                continue;
            }
            let n = (&p * &q).complete();
            if n.significant_bits() != bit_length {
                continue;
            }
            match Self::from_primes(p, q) {
                Ok(dk) => return Ok(dk),
                // gcd(lambda, n) != 1: negligible probability, resample.
                Err(Error::InvalidArgument(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Like [`Self::generate`], but samples safe primes (`p` with `(p-1)/2`
    /// also prime) for extra structural hardening against factoring
    /// shortcuts that target smooth `p-1`. Not the default: the base
    /// specification does not require safe primes, and they cost
    /// substantially more key-generation time.
    pub fn generate_with_safe_primes(
        rng: &mut (impl RngCore + CryptoRng),
        bit_length: u32,
    ) -> Result<Self> {
        if bit_length == 0 || bit_length % 8 != 0 {
            return Err(Error::InvalidArgument(
                "key size must be a positive multiple of 8".into(),
            ));
        }
        let half = bit_length / 2;
        loop {
            let p = utils::generate_safe_prime(rng, half);
            let q = utils::generate_safe_prime(rng, half);
            if p == q {
                continue;
            }
            let n = (&p * &q).complete();
            if n.significant_bits() != bit_length {
                continue;
            }
            match Self::from_primes(p, q) {
                Ok(dk) => return Ok(dk),
                Err(Error::InvalidArgument(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Constructs a paillier key from primes `p`, `q`. Fails with
    /// `InvalidArgument` if `p == q` or `lambda = (p-1)(q-1)` is not
    /// invertible mod `n` (needed for the lambda/mu wire form of §6).
    pub fn from_primes(p: Integer, q: Integer) -> Result<Self> {
        if p == q {
            return Err(Error::InvalidArgument("p and q must differ".into()));
        }

        let n = (&p * &q).complete();
        let ek = EncryptionKey::from_n(n);

        let pm1 = Integer::from(&p - 1);
        let qm1 = Integer::from(&q - 1);
        let lambda = (&pm1 * &qm1).complete();
        let mu = utils::mod_inverse(&lambda, ek.n())
            .map_err(|_| Error::InvalidArgument("lambda is not invertible mod n".into()))?;

        let p_squared = (&p * &p).complete();
        let q_squared = (&q * &q).complete();
        let p_inv_mod_q = utils::mod_inverse(&p, &q)
            .map_err(|_| Error::InvalidArgument("p is not invertible mod q".into()))?;

        let gp = utils::mod_pow_secure(ek.g(), &pm1, &p_squared)?;
        let hp = utils::mod_inverse(&l(&gp, &p), &p)
            .map_err(|_| Error::InvalidArgument("invalid (p, q): hp undefined".into()))?;
        let gq = utils::mod_pow_secure(ek.g(), &qm1, &q_squared)?;
        let hq = utils::mod_inverse(&l(&gq, &q), &q)
            .map_err(|_| Error::InvalidArgument("invalid (p, q): hq undefined".into()))?;

        let fast_pow_n = FastPowN::build(ek.n(), &p, &q)?;

        Ok(Self {
            ek,
            p,
            q,
            p_squared,
            q_squared,
            p_inv_mod_q,
            hp,
            hq,
            lambda,
            mu,
            fast_pow_n,
        })
    }

    /// Recovers `p, q` from `n` and the totient `lambda = (p-1)(q-1)` by
    /// solving `x^2 - (n+1-lambda)x + n = 0` over the integers (§3, §9):
    /// since `p+q = n+1-lambda` and `p*q = n`, the roots of that quadratic
    /// are exactly `p` and `q`, recovered via an exact integer square root
    /// of the discriminant `(p+q)^2 - 4pq = (p-q)^2`.
    ///
    /// This is the form the JSON wire format (§6) stores private keys in.
    pub fn from_totient(n: Integer, lambda: Integer) -> Result<Self> {
        let sum_pq = Integer::from(&n + 1) - &lambda;
        let discriminant = (&sum_pq * &sum_pq).complete() - Integer::from(&n << 2);
        if !utils::is_perfect_square(&discriminant) {
            return Err(Error::InvalidArgument(
                "n, lambda do not correspond to a valid paillier key".into(),
            ));
        }
        let root = utils::isqrt(&discriminant);
        let two = Integer::from(2);
        let p = (Integer::from(&sum_pq + &root)).div_rem(two.clone()).0;
        let q = (Integer::from(&sum_pq - &root)).div_rem(two).0;

        let dk = Self::from_primes(p, q)?;
        if dk.ek.n() != &n || dk.lambda != lambda {
            return Err(Error::InvalidArgument(
                "n, lambda do not correspond to a valid paillier key".into(),
            ));
        }
        Ok(dk)
    }

    /// Decrypts `c` to a raw plaintext in `[0, n)`, via CRT (the preferred,
    /// ~4x faster form since `p`, `q` are known).
    pub fn raw_decrypt(&self, c: &Integer) -> Result<Integer> {
        if !self.ek.is_valid_ciphertext(c) {
            return Err(Error::InvalidCiphertext);
        }

        let pm1 = Integer::from(&self.p - 1);
        let qm1 = Integer::from(&self.q - 1);

        let cp = utils::mod_pow_secure(c, &pm1, &self.p_squared)?;
        let mp = (l(&cp, &self.p) * &self.hp) % &self.p;

        let cq = utils::mod_pow_secure(c, &qm1, &self.q_squared)?;
        let mq = (l(&cq, &self.q) * &self.hq) % &self.q;

        let diff = (&mq - &mp).complete();
        use crate::utils::IntegerExt;
        let h = (diff * &self.p_inv_mod_q).modulo(&self.q);

        Ok((mp + (&self.p * h).complete()) % self.ek.n())
    }

    /// Decrypts `c` to a raw plaintext in `[0, n)` via the totient form
    /// (`m = L(c^lambda mod n^2, n) * mu mod n`), used when only `lambda`
    /// (not `p`, `q` directly) is available. `p`, `q` are always recovered
    /// at construction time in this crate, so this is provided mainly for
    /// parity with §4.C and for cross-checking the CRT path in tests.
    pub fn raw_decrypt_with_lambda(&self, c: &Integer) -> Result<Integer> {
        if !self.ek.is_valid_ciphertext(c) {
            return Err(Error::InvalidCiphertext);
        }
        let a = utils::mod_pow_secure(c, &self.lambda, self.ek.nn())?;
        let plaintext = (l(&a, self.ek.n()) * &self.mu) % self.ek.n();
        Ok(plaintext)
    }

    /// Encrypts `m` with fresh randomness, using the known factorization of
    /// `n` to obfuscate roughly 4x faster than [`EncryptionKey::raw_encrypt`].
    pub fn raw_encrypt(&self, m: &Integer, rng: &mut (impl RngCore + CryptoRng)) -> Result<Integer> {
        let c = self.ek.raw_encrypt_without_obfuscation(m)?;
        self.raw_obfuscate(&c, rng)
    }

    /// Like [`EncryptionKey::raw_obfuscate`], but uses the known
    /// factorization of `n` to compute `r^n mod n^2` via CRT.
    pub fn raw_obfuscate(&self, c: &Integer, rng: &mut (impl RngCore + CryptoRng)) -> Result<Integer> {
        if !self.ek.is_valid_ciphertext(c) {
            return Err(Error::InvalidCiphertext);
        }
        let r = utils::sample_in_mult_group(rng, self.ek.n());
        let rn = self.fast_pow_n.exp(&r)?;
        Ok((c * rn).complete() % self.ek.nn())
    }

    /// Returns the (public) encryption key corresponding to this private key.
    pub fn encryption_key(&self) -> &EncryptionKey {
        &self.ek
    }

    /// The Paillier modulus `n`.
    pub fn n(&self) -> &Integer {
        self.ek.n()
    }

    /// `lambda = (p-1)(q-1)`.
    pub fn lambda(&self) -> &Integer {
        &self.lambda
    }

    /// `mu = lambda^-1 mod n`.
    pub fn mu(&self) -> &Integer {
        &self.mu
    }

    /// Prime `p`.
    pub fn p(&self) -> &Integer {
        &self.p
    }

    /// Prime `q`.
    pub fn q(&self) -> &Integer {
        &self.q
    }

    /// Bit length of the smaller prime (`p` or `q`).
    pub fn bits_length(&self) -> u32 {
        self.p.significant_bits().min(self.q.significant_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_key() -> DecryptionKey {
        // Toy 16-bit-ish modulus; only exercises correctness, not security.
        DecryptionKey::from_primes(Integer::from(61), Integer::from(53)).unwrap()
    }

    #[test]
    fn crt_and_lambda_decrypt_agree() {
        let dk = small_key();
        let mut rng = rand_dev::DevRng::new();
        for m in [0u32, 1, 42, 1000, 3000] {
            let c = dk.raw_encrypt(&Integer::from(m), &mut rng).unwrap();
            assert_eq!(dk.raw_decrypt(&c).unwrap(), Integer::from(m));
            assert_eq!(dk.raw_decrypt_with_lambda(&c).unwrap(), Integer::from(m));
        }
    }

    #[test]
    fn recovers_factors_from_totient() {
        let dk = small_key();
        let recovered = DecryptionKey::from_totient(dk.n().clone(), dk.lambda().clone()).unwrap();
        assert_eq!(
            (recovered.p().clone().min(recovered.q().clone())),
            Integer::from(53)
        );
        assert_eq!(
            (recovered.p().clone().max(recovered.q().clone())),
            Integer::from(61)
        );
    }

    #[test]
    fn rejects_equal_primes() {
        assert!(DecryptionKey::from_primes(Integer::from(61), Integer::from(61)).is_err());
    }
}
