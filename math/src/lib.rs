pub mod biguint;

pub use biguint::BigUint;

#[doc(hidden)]
pub use {malachite_base, malachite_nz};
