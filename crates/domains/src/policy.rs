//! # Access Policy
//!
//! Who may read or mutate what. Error messages deliberately say nothing about
//! the actual owner of the target.

use crate::error::{AppError, Result};
use crate::models::{Ad, Participants, UserId};

/// Only the owner of an ad may edit or delete it.
pub fn can_mutate(ad: &Ad, user: UserId) -> bool {
    ad.user_id == user
}

/// A user takes part in a proposal when they own either linked ad.
pub fn is_participant(participants: &Participants, user: UserId) -> bool {
    participants.sender_owner == user || participants.receiver_owner == user
}

pub fn ensure_can_mutate(ad: &Ad, user: UserId) -> Result<()> {
    if can_mutate(ad, user) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "you do not have permission to modify this ad".to_string(),
        ))
    }
}

pub fn ensure_participant(participants: &Participants, user: UserId) -> Result<()> {
    if is_participant(participants, user) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "you do not have permission to modify this proposal".to_string(),
        ))
    }
}
