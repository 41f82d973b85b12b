use serde::Serialize;
use thiserror::Error;

use crate::campaign::{CampaignModel, CampaignStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid price format (ex: 1,50): {0}")]
    Format(String),

    #[error("Price out of range: {0}")]
    Overflow(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every failed field rule, in evaluation order.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
#[error("{}", joined(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn joined(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CampaignError {
    #[error("Invalid campaign: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Cannot {action} a {from:?} campaign")]
    InvalidTransition {
        from: CampaignStatus,
        action: &'static str,
    },

    #[error("Draft expired before publication")]
    DraftExpired,

    #[error("Field {0} cannot change once the campaign is published")]
    Locked(&'static str),

    #[error("Campaign is not accepting reservations")]
    NotActive,

    #[error("Campaign uses {expected:?} selection")]
    ModelMismatch { expected: CampaignModel },

    #[error("Purchase must be between {min} and {max} tickets, got {requested}")]
    PurchaseSize { min: u32, max: u32, requested: u32 },

    #[error("Ticket {0} does not exist")]
    OutOfRange(u32),

    #[error("Ticket {0} selected twice")]
    Duplicate(u32),

    #[error("Email is required for this campaign")]
    EmailRequired,

    #[error("Buyer {0} is required")]
    MissingBuyerField(&'static str),

    #[error("Only {available} tickets left, {requested} requested")]
    SoldOut { requested: u32, available: u32 },

    #[error("Tickets already taken: {0:?}")]
    Unavailable(Vec<u32>),

    #[error("Reservations past their payment deadline: {0:?}")]
    Expired(Vec<u32>),

    #[error("Ranking is disabled for this campaign")]
    RankingDisabled,

    #[error("Winning ticket {0} was not purchased")]
    UnknownWinner(u32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Unsupported file type {0}. Use JPG, PNG or WebP")]
    Type(String),

    #[error("File too large ({0} bytes). Max 5MB per image")]
    TooLarge(usize),

    #[error("Empty file")]
    Empty,

    #[error("No image at position {0}")]
    Index(usize),

    #[error("At most {0} prize images per campaign")]
    Limit(usize),
}
