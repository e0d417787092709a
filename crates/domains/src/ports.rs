//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::filters::{AdFilter, ProposalFilter};
use crate::models::{
    AccessToken, Ad, AdChanges, AdId, NewAd, NewProposal, Page, PageRequest, Proposal,
    ProposalId, ProposalStatus, User, UserId, UserRecord,
};

/// Data persistence contract for ads.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AdRepository: Send + Sync {
    async fn insert(&self, owner: UserId, ad: NewAd) -> Result<Ad>;
    async fn find(&self, id: AdId) -> Result<Option<Ad>>;
    /// Ordered by creation time ascending, ties broken by id.
    async fn list(&self, filter: &AdFilter, page: PageRequest) -> Result<Page<Ad>>;
    /// Returns `None` when the ad no longer exists.
    async fn update(&self, id: AdId, changes: AdChanges) -> Result<Option<Ad>>;
    /// Also removes every proposal that references the ad in either role.
    async fn delete(&self, id: AdId) -> Result<bool>;
}

/// Data persistence contract for exchange proposals.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Fails with `NotFound` if either referenced ad has disappeared.
    async fn insert(&self, proposal: NewProposal) -> Result<Proposal>;
    async fn find(&self, id: ProposalId) -> Result<Option<Proposal>>;
    /// Only proposals where `user` owns the sender or the receiver ad.
    async fn list_for_participant(
        &self,
        user: UserId,
        filter: &ProposalFilter,
    ) -> Result<Vec<Proposal>>;
    async fn update_status(&self, id: ProposalId, status: ProposalStatus)
        -> Result<Option<Proposal>>;
    async fn delete(&self, id: ProposalId) -> Result<bool>;
}

/// Account persistence contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User>;
    async fn find(&self, id: UserId) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
}

/// Identity contract: password hashing and bearer tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a self-describing (PHC string) password hash
    async fn hash_password(&self, password: &str) -> Result<String>;

    /// Verifies a password against a stored hash; malformed hashes never match
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Signs a token identifying `user`
    fn issue_token(&self, user: UserId) -> Result<AccessToken>;

    /// Resolves a token back to the user it was issued for
    fn verify_token(&self, token: &str) -> Result<UserId>;
}
