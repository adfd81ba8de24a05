pub mod config;
pub mod permutation;
pub mod range;

// Utils
pub mod ip_iter;
pub mod lookup_pool;

pub use permutation::AddressRangePermutation;
pub use range::{AddressFamily, AddressRange, RangeError};
