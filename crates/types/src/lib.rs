//! Stipend shared types
//!
//! Value types passed between the distribution engine, its external
//! collaborators and the host: account identifiers, region codes, rounds,
//! amounts and the enrollment data returned by identity verifiers.

pub mod account;
pub mod enrollment;
pub mod region;
pub mod units;

pub use account::*;
pub use enrollment::*;
pub use region::*;
pub use units::*;
