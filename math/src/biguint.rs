use malachite_base::num::{arithmetic::traits::CheckedSub, basic::traits::Zero};
use malachite_nz::{natural::Natural, platform::Limb};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Add, AddAssign, Div, Mul, Shl, Shr},
};

/// Arbitrary precision unsigned integer used for reward and fee accumulators
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BigUint(Natural);

impl BigUint {
    pub const ZERO: Self = BigUint(Natural::ZERO);

    #[inline]
    pub fn from_u64(n: u64) -> Self {
        Self(Natural::from(n))
    }

    #[inline]
    pub fn from_u128(n: u128) -> Self {
        Self(Natural::from(n))
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == Natural::ZERO
    }

    /// Returns `None` on underflow
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        (&self.0).checked_sub(&other.0).map(Self)
    }

    pub fn saturating_sub(&self, other: &Self) -> Self {
        self.checked_sub(other).unwrap_or(Self::ZERO)
    }

    /// Floor division, `None` when dividing by zero
    pub fn checked_div(&self, other: &Self) -> Option<Self> {
        if other.is_zero() { None } else { Some(Self(&self.0 / &other.0)) }
    }

    /// Returns the value as `u64` if it fits
    pub fn to_u64(&self) -> Option<u64> {
        u64::try_from(&self.0).ok()
    }

    /// Returns the value as `u64`, clamping to `u64::MAX` if it does not fit
    pub fn saturating_to_u64(&self) -> u64 {
        self.to_u64().unwrap_or(u64::MAX)
    }

    /// Little endian bytes with no trailing zeros. Zero is encoded as the empty vector.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.0.to_limbs_asc().into_iter().flat_map(|limb| limb.to_le_bytes()).collect();
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        bytes
    }

    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        const LIMB_BYTES: usize = size_of::<Limb>();
        let limbs: Vec<Limb> = bytes
            .chunks(LIMB_BYTES)
            .map(|chunk| {
                let mut buf = [0u8; LIMB_BYTES];
                buf[..chunk.len()].copy_from_slice(chunk);
                Limb::from_le_bytes(buf)
            })
            .collect();
        Self(Natural::from_limbs_asc(&limbs))
    }
}

impl Default for BigUint {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u64> for BigUint {
    fn from(n: u64) -> Self {
        Self::from_u64(n)
    }
}

impl Add for BigUint {
    type Output = BigUint;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<&BigUint> for &BigUint {
    type Output = BigUint;

    fn add(self, rhs: &BigUint) -> Self::Output {
        BigUint(&self.0 + &rhs.0)
    }
}

impl AddAssign<&BigUint> for BigUint {
    fn add_assign(&mut self, rhs: &BigUint) {
        self.0 += &rhs.0;
    }
}

impl Mul for BigUint {
    type Output = BigUint;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl Mul<u64> for &BigUint {
    type Output = BigUint;

    fn mul(self, rhs: u64) -> Self::Output {
        BigUint(&self.0 * Natural::from(rhs))
    }
}

/// # Panics
/// Panics if `rhs` is zero, use [`BigUint::checked_div`] when the divisor may be zero.
impl Div for BigUint {
    type Output = BigUint;

    fn div(self, rhs: Self) -> Self::Output {
        Self(self.0 / rhs.0)
    }
}

impl Shl<u32> for BigUint {
    type Output = BigUint;

    fn shl(self, rhs: u32) -> Self::Output {
        Self(self.0 << rhs)
    }
}

impl Shr<u32> for BigUint {
    type Output = BigUint;

    fn shr(self, rhs: u32) -> Self::Output {
        Self(self.0 >> rhs)
    }
}

impl Display for BigUint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for BigUint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BigUint({})", self.0)
    }
}

impl Serialize for BigUint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_le_bytes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BigUint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Ok(Self::from_le_bytes(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_shift_and_divide() {
        let minted = BigUint::from_u64(1_000);
        let rate = (minted << 96).checked_div(&BigUint::from_u64(3)).unwrap();
        let back = (&rate * 3) >> 96;
        // floor division loses strictly less than one unit after shifting back
        assert_eq!(back.to_u64(), Some(999));
        assert!(BigUint::from_u64(5).checked_div(&BigUint::ZERO).is_none());
    }

    #[test]
    fn test_sub_and_conversions() {
        let a = BigUint::from_u64(10);
        let b = BigUint::from_u64(3);
        assert_eq!(a.checked_sub(&b), Some(BigUint::from_u64(7)));
        assert_eq!(b.checked_sub(&a), None);
        assert_eq!(b.saturating_sub(&a), BigUint::ZERO);

        let big = BigUint::from_u64(u64::MAX) << 1;
        assert_eq!(big.to_u64(), None);
        assert_eq!(big.saturating_to_u64(), u64::MAX);
        assert_eq!(BigUint::from_u128(u64::MAX as u128 + 1), BigUint::from_u64(1) << 64);
    }

    #[test]
    fn test_byte_encoding() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..64 {
            let v = BigUint::from_u128(rng.r#gen::<u128>()) << rng.gen_range(0..100);
            assert_eq!(BigUint::from_le_bytes(&v.to_le_bytes()), v);
        }
        assert!(BigUint::ZERO.to_le_bytes().is_empty());

        let v = BigUint::from_u64(123_456_789) << 90;
        let encoded = bincode::serialize(&v).unwrap();
        assert_eq!(bincode::deserialize::<BigUint>(&encoded).unwrap(), v);
    }
}
