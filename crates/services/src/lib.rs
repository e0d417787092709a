//! # services
//!
//! Use cases composed from the domain ports. Every operation receives the
//! resolved caller identity explicitly; nothing reads ambient request state.

pub mod accounts;
pub mod ads;
pub mod proposals;

pub use accounts::AccountService;
pub use ads::AdService;
pub use proposals::ProposalService;
