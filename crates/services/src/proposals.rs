//! Exchange proposal workflow.
//!
//! Creation is open to any authenticated user for any two existing ads, even
//! ads the caller does not own; those cases are flagged in the log but not
//! rejected. Status transitions are unconstrained: any participant may set any
//! of the three statuses at any time, including re-opening a decided proposal.

use std::sync::Arc;

use domains::policy::{ensure_participant, is_participant};
use domains::{
    AdId, AdRepository, AppError, Participants, Proposal, ProposalFilter, ProposalId,
    ProposalInput, ProposalRepository, RawBody, Result, StatusUpdate, UserId,
};

pub struct ProposalService {
    proposals: Arc<dyn ProposalRepository>,
    ads: Arc<dyn AdRepository>,
}

impl ProposalService {
    pub fn new(proposals: Arc<dyn ProposalRepository>, ads: Arc<dyn AdRepository>) -> Self {
        Self { proposals, ads }
    }

    pub async fn list(&self, caller: UserId, filter: &ProposalFilter) -> Result<Vec<Proposal>> {
        self.proposals.list_for_participant(caller, filter).await
    }

    /// Non-participants get the same answer as for a missing proposal.
    pub async fn get(&self, caller: UserId, id: ProposalId) -> Result<Proposal> {
        let (proposal, participants) = self.load(id).await?;
        if !is_participant(&participants, caller) {
            return Err(AppError::not_found("Proposal", id));
        }
        Ok(proposal)
    }

    pub async fn create(&self, caller: UserId, input: ProposalInput) -> Result<Proposal> {
        let new_proposal = input.validate()?;
        let sender = self.require_ad(new_proposal.ad_sender_id).await?;
        let receiver = self.require_ad(new_proposal.ad_receiver_id).await?;

        let proposal = self.proposals.insert(new_proposal).await?;

        let participants = Participants::of(&sender, &receiver);
        let caller_is_participant = is_participant(&participants, caller);
        if !caller_is_participant {
            tracing::warn!(
                proposal_id = %proposal.id,
                caller = %caller,
                "proposal created by a user owning neither ad"
            );
        }
        tracing::info!(
            proposal_id = %proposal.id,
            ad_sender_id = %proposal.ad_sender_id,
            ad_receiver_id = %proposal.ad_receiver_id,
            self_proposal = proposal.ad_sender_id == proposal.ad_receiver_id,
            caller_is_participant,
            "proposal created"
        );
        Ok(proposal)
    }

    /// Sets the status to any of the three values. The proposal is left
    /// untouched when the requested status is not one of them.
    pub async fn update_status(
        &self,
        caller: UserId,
        id: ProposalId,
        body: RawBody,
    ) -> Result<Proposal> {
        let (current, participants) = self.load(id).await?;
        ensure_participant(&participants, caller)?;
        let status = body.decode::<StatusUpdate>()?.validate()?;

        let updated = self
            .proposals
            .update_status(id, status)
            .await?
            .ok_or_else(|| AppError::not_found("Proposal", id))?;
        tracing::info!(
            proposal_id = %id,
            caller = %caller,
            from = %current.status,
            to = %updated.status,
            "proposal status changed"
        );
        Ok(updated)
    }

    pub async fn delete(&self, caller: UserId, id: ProposalId) -> Result<()> {
        let (_, participants) = self.load(id).await?;
        ensure_participant(&participants, caller)?;
        if !self.proposals.delete(id).await? {
            return Err(AppError::not_found("Proposal", id));
        }
        tracing::info!(proposal_id = %id, caller = %caller, "proposal deleted");
        Ok(())
    }

    async fn require_ad(&self, id: AdId) -> Result<domains::Ad> {
        self.ads
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Ad", id))
    }

    /// Fetches a proposal and the owners of both its ads. Ads cascade onto
    /// their proposals, so a missing ad means the proposal is gone as well.
    async fn load(&self, id: ProposalId) -> Result<(Proposal, Participants)> {
        let proposal = self
            .proposals
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Proposal", id))?;
        let gone = || AppError::not_found("Proposal", id);
        let sender = self.ads.find(proposal.ad_sender_id).await?.ok_or_else(gone)?;
        let receiver = self.ads.find(proposal.ad_receiver_id).await?.ok_or_else(gone)?;
        let participants = Participants::of(&sender, &receiver);
        Ok((proposal, participants))
    }
}
