//! # InMemoryStore
//!
//! A process-local implementation of every repository port, backed by
//! `DashMap`. It mirrors the relational store's guarantees that matter to the
//! domain: unique usernames, monotonically assigned ids and the ad-to-proposal
//! cascade. Data is lost on restart.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    Ad, AdChanges, AdFilter, AdId, AdRepository, AppError, NewAd, NewProposal, Page, PageRequest,
    Proposal, ProposalFilter, ProposalId, ProposalRepository, ProposalStatus, Result, User,
    UserId, UserRecord, UserRepository,
};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: DashMap<UserId, UserRecord>,
    usernames: DashMap<String, UserId>,
    ads: DashMap<AdId, Ad>,
    proposals: DashMap<ProposalId, Proposal>,
    next_user: AtomicI64,
    next_ad: AtomicI64,
    next_proposal: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn owner_of(&self, ad: AdId) -> Option<UserId> {
        self.ads.get(&ad).map(|entry| entry.user_id)
    }
}

/// Stable ascending order: creation time first, id second.
fn sort_by_creation<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by_key(|item| key(item));
}

#[async_trait]
impl AdRepository for InMemoryStore {
    async fn insert(&self, owner: UserId, ad: NewAd) -> Result<Ad> {
        let ad = Ad {
            id: AdId(Self::next(&self.next_ad)),
            user_id: owner,
            title: ad.title,
            description: ad.description,
            image_url: ad.image_url,
            category: ad.category,
            condition: ad.condition,
            created_at: Utc::now(),
        };
        self.ads.insert(ad.id, ad.clone());
        Ok(ad)
    }

    async fn find(&self, id: AdId) -> Result<Option<Ad>> {
        Ok(self.ads.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &AdFilter, page: PageRequest) -> Result<Page<Ad>> {
        let mut matching: Vec<Ad> = self
            .ads
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sort_by_creation(&mut matching, |ad| (ad.created_at, ad.id.0));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    async fn update(&self, id: AdId, changes: AdChanges) -> Result<Option<Ad>> {
        Ok(self.ads.get_mut(&id).map(|mut entry| {
            changes.apply(entry.value_mut());
            entry.value().clone()
        }))
    }

    async fn delete(&self, id: AdId) -> Result<bool> {
        if self.ads.remove(&id).is_none() {
            return Ok(false);
        }
        let before = self.proposals.len();
        self.proposals.retain(|_, proposal| !proposal.references(id));
        tracing::debug!(
            ad_id = %id,
            cascaded = before.saturating_sub(self.proposals.len()),
            "removed ad and dependent proposals"
        );
        Ok(true)
    }
}

#[async_trait]
impl ProposalRepository for InMemoryStore {
    async fn insert(&self, proposal: NewProposal) -> Result<Proposal> {
        for ad in [proposal.ad_sender_id, proposal.ad_receiver_id] {
            if !self.ads.contains_key(&ad) {
                return Err(AppError::not_found("Ad", ad));
            }
        }
        let proposal = Proposal {
            id: ProposalId(Self::next(&self.next_proposal)),
            ad_sender_id: proposal.ad_sender_id,
            ad_receiver_id: proposal.ad_receiver_id,
            comment: proposal.comment,
            status: ProposalStatus::default(),
            created_at: Utc::now(),
        };
        self.proposals.insert(proposal.id, proposal.clone());
        Ok(proposal)
    }

    async fn find(&self, id: ProposalId) -> Result<Option<Proposal>> {
        Ok(self.proposals.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_for_participant(
        &self,
        user: UserId,
        filter: &ProposalFilter,
    ) -> Result<Vec<Proposal>> {
        // Snapshot first so no proposal shard lock is held while reading ads.
        let candidates: Vec<Proposal> = self
            .proposals
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        let mut visible: Vec<Proposal> = candidates
            .into_iter()
            .filter(|p| {
                self.owner_of(p.ad_sender_id) == Some(user)
                    || self.owner_of(p.ad_receiver_id) == Some(user)
            })
            .collect();
        sort_by_creation(&mut visible, |p| (p.created_at, p.id.0));
        Ok(visible)
    }

    async fn update_status(
        &self,
        id: ProposalId,
        status: ProposalStatus,
    ) -> Result<Option<Proposal>> {
        Ok(self.proposals.get_mut(&id).map(|mut entry| {
            entry.status = status;
            entry.value().clone()
        }))
    }

    async fn delete(&self, id: ProposalId) -> Result<bool> {
        Ok(self.proposals.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User> {
        match self.usernames.entry(username.to_owned()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "username {username} is already taken"
            ))),
            Entry::Vacant(slot) => {
                let user = User {
                    id: UserId(Self::next(&self.next_user)),
                    username: username.to_owned(),
                    created_at: Utc::now(),
                };
                slot.insert(user.id);
                self.users.insert(
                    user.id,
                    UserRecord {
                        user: user.clone(),
                        password_hash: password_hash.to_owned(),
                    },
                );
                Ok(user)
            }
        }
    }

    async fn find(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.user.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let Some(id) = self.usernames.get(username).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }
}
