//! # Domain Models
//!
//! These structs represent the core entities of the barter marketplace.
//! Identifiers are store-assigned integers wrapped in newtypes so an ad id
//! can never be passed where a proposal id is expected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Identifies a registered user.
    UserId
);
define_id!(
    /// Identifies an ad.
    AdId
);
define_id!(
    /// Identifies an exchange proposal.
    ProposalId
);

/// Raised when a string does not name a variant of one of the closed enums.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("\"{value}\" is not a valid {kind}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Physical condition of the item behind an ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "used" => Ok(Self::Used),
            other => Err(ParseEnumError {
                kind: "condition",
                value: other.to_string(),
            }),
        }
    }
}

/// Decision state of an exchange proposal.
///
/// This is a re-settable field, not a state machine: any value may follow
/// any other, including moving an accepted proposal back to pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl ProposalStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// A registered account. The password hash never leaves the store layer
/// except through [`UserRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A user together with its stored credential, as read for login.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

/// A listing of an item offered for exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub id: AdId,
    /// Set once at creation, never changed afterwards
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub condition: Condition,
    pub created_at: DateTime<Utc>,
}

/// Validated payload for a new ad; the owner is supplied separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAd {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub condition: Condition,
}

/// Validated set of changes to an ad's mutable fields.
///
/// `image_url: Some(None)` clears the image, `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Option<String>>,
    pub category: Option<String>,
    pub condition: Option<Condition>,
}

impl AdChanges {
    pub fn apply(&self, ad: &mut Ad) {
        if let Some(title) = &self.title {
            ad.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            ad.description.clone_from(description);
        }
        if let Some(image_url) = &self.image_url {
            ad.image_url.clone_from(image_url);
        }
        if let Some(category) = &self.category {
            ad.category.clone_from(category);
        }
        if let Some(condition) = self.condition {
            ad.condition = condition;
        }
    }
}

impl From<NewAd> for AdChanges {
    /// A full replacement touches every mutable field.
    fn from(ad: NewAd) -> Self {
        Self {
            title: Some(ad.title),
            description: Some(ad.description),
            image_url: Some(ad.image_url),
            category: Some(ad.category),
            condition: Some(ad.condition),
        }
    }
}

/// An offer to exchange the sender's ad for the receiver's ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub ad_sender_id: AdId,
    pub ad_receiver_id: AdId,
    pub comment: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn references(&self, ad: AdId) -> bool {
        self.ad_sender_id == ad || self.ad_receiver_id == ad
    }
}

/// Validated payload for a new proposal. Status always starts as pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProposal {
    pub ad_sender_id: AdId,
    pub ad_receiver_id: AdId,
    pub comment: String,
}

/// Owners of the two ads a proposal links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participants {
    pub sender_owner: UserId,
    pub receiver_owner: UserId,
}

impl Participants {
    pub fn of(sender_ad: &Ad, receiver_ad: &Ad) -> Self {
        Self {
            sender_owner: sender_ad.user_id,
            receiver_owner: receiver_ad.user_id,
        }
    }
}

/// A 1-based page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const fn first(page_size: u32) -> Self {
        Self { page: 1, page_size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// One page of results plus the total number of matching records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn num_pages(&self) -> u32 {
        if self.request.page_size == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.request.page_size)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn next(&self) -> Option<u32> {
        (self.request.page < self.num_pages()).then(|| self.request.page + 1)
    }

    pub fn previous(&self) -> Option<u32> {
        (self.request.page > 1).then(|| self.request.page - 1)
    }

    /// Page 1 always exists; any later page must fall inside the result set.
    pub fn is_out_of_range(&self) -> bool {
        self.request.page > 1 && self.request.page > self.num_pages()
    }
}

/// A signed bearer token handed out at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ad() -> Ad {
        Ad {
            id: AdId(1),
            user_id: UserId(7),
            title: "Bike".to_string(),
            description: "Red city bike".to_string(),
            image_url: Some("http://example.com/bike.jpg".to_string()),
            category: "Sport".to_string(),
            condition: Condition::New,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_enums_parse_only_known_values() {
        assert_eq!("used".parse::<Condition>(), Ok(Condition::Used));
        assert!("broken".parse::<Condition>().is_err());
        assert_eq!("declined".parse::<ProposalStatus>(), Ok(ProposalStatus::Declined));
        let err = "approved".parse::<ProposalStatus>().unwrap_err();
        assert_eq!(err.to_string(), "\"approved\" is not a valid status");
    }

    #[test]
    fn test_status_defaults_to_pending() {
        assert_eq!(ProposalStatus::default(), ProposalStatus::Pending);
    }

    #[test]
    fn test_changes_leave_owner_and_timestamp_alone() {
        let mut ad = sample_ad();
        let before = ad.clone();
        let changes = AdChanges {
            title: Some("Mountain bike".to_string()),
            image_url: Some(None),
            ..AdChanges::default()
        };
        changes.apply(&mut ad);

        assert_eq!(ad.title, "Mountain bike");
        assert_eq!(ad.image_url, None);
        assert_eq!(ad.description, before.description);
        assert_eq!(ad.user_id, before.user_id);
        assert_eq!(ad.created_at, before.created_at);
    }

    #[test]
    fn test_page_navigation() {
        let page = Page {
            items: vec![1, 2],
            total: 12,
            request: PageRequest { page: 2, page_size: 5 },
        };
        assert_eq!(page.num_pages(), 3);
        assert_eq!(page.next(), Some(3));
        assert_eq!(page.previous(), Some(1));
        assert!(!page.is_out_of_range());

        let empty = Page::<u8> {
            items: vec![],
            total: 0,
            request: PageRequest::first(10),
        };
        assert_eq!(empty.num_pages(), 1);
        assert!(!empty.is_out_of_range());

        let past_end = Page::<u8> {
            items: vec![],
            total: 3,
            request: PageRequest { page: 2, page_size: 10 },
        };
        assert!(past_end.is_out_of_range());
    }

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&AdId(42)).unwrap();
        assert_eq!(json, "42");
        assert_eq!(" 9 ".parse::<ProposalId>(), Ok(ProposalId(9)));
    }
}
