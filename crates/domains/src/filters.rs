//! # Query Filters
//!
//! Listing parameters arrive as optional strings. They are parsed once into
//! [`AdFilter`] / [`ProposalFilter`], which storage adapters translate into
//! predicates. The `matches` methods are the reference semantics that every
//! adapter must reproduce.

use serde::Deserialize;

use crate::error::{Result, ValidationErrors};
use crate::models::{Ad, AdId, Condition, PageRequest, Proposal, ProposalStatus};

/// Ad listing predicate. Every present field must hold (logical AND).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdFilter {
    pub category: Option<String>,
    pub condition: Option<Condition>,
    /// Case-insensitive substring of the title or the description
    pub search: Option<String>,
}

impl AdFilter {
    pub fn matches(&self, ad: &Ad) -> bool {
        if self.category.as_ref().is_some_and(|c| *c != ad.category) {
            return false;
        }
        if self.condition.is_some_and(|c| c != ad.condition) {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                ad.title.to_lowercase().contains(&needle)
                    || ad.description.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Proposal listing predicate, always intersected with the caller's
/// participant scope by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalFilter {
    pub ad_sender_id: Option<AdId>,
    pub ad_receiver_id: Option<AdId>,
    pub status: Option<ProposalStatus>,
}

impl ProposalFilter {
    pub fn matches(&self, proposal: &Proposal) -> bool {
        self.ad_sender_id.map_or(true, |id| id == proposal.ad_sender_id)
            && self.ad_receiver_id.map_or(true, |id| id == proposal.ad_receiver_id)
            && self.status.map_or(true, |s| s == proposal.status)
    }
}

/// Raw `?category=&condition=&search=&page=` parameters of the ad listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdListQuery {
    pub category: Option<String>,
    pub condition: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

impl AdListQuery {
    pub fn parse(self, page_size: u32) -> Result<(AdFilter, PageRequest)> {
        let mut errors = ValidationErrors::default();

        let condition = non_empty(self.condition).and_then(|raw| match raw.parse::<Condition>() {
            Ok(c) => Some(c),
            Err(e) => {
                errors.push("condition", format!("{e}."));
                None
            }
        });

        let page = match non_empty(self.page) {
            None => 1,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    errors.push("page", "Invalid page.");
                    1
                }
            },
        };

        let filter = AdFilter {
            category: non_empty(self.category),
            condition,
            search: non_empty(self.search),
        };
        errors.into_result((filter, PageRequest { page, page_size }))
    }
}

/// Raw `?ad_sender_id=&ad_receiver_id=&status=` parameters of the proposal listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposalListQuery {
    pub ad_sender_id: Option<String>,
    pub ad_receiver_id: Option<String>,
    pub status: Option<String>,
}

impl ProposalListQuery {
    pub fn parse(self) -> Result<ProposalFilter> {
        let mut errors = ValidationErrors::default();
        let ad_sender_id = parse_id(&mut errors, "ad_sender_id", self.ad_sender_id);
        let ad_receiver_id = parse_id(&mut errors, "ad_receiver_id", self.ad_receiver_id);
        let status = non_empty(self.status).and_then(|raw| match raw.parse::<ProposalStatus>() {
            Ok(s) => Some(s),
            Err(e) => {
                errors.push("status", format!("{e}."));
                None
            }
        });
        errors.into_result(ProposalFilter {
            ad_sender_id,
            ad_receiver_id,
            status,
        })
    }
}

/// Empty parameters impose no constraint.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_id(errors: &mut ValidationErrors, field: &str, value: Option<String>) -> Option<AdId> {
    let raw = non_empty(value)?;
    match raw.parse::<AdId>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(field, "A valid integer is required.");
            None
        }
    }
}
