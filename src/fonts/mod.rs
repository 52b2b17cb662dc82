//! Font program handling: the TrueType/OpenType subsetter.

mod subset;

pub use subset::{checksum, TrueTypeSubsetter};
