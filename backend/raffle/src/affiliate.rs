use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ValidationErrors, money::Cents};

pub const DEFAULT_COMMISSION_PERCENT: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Commission {
    Percentage(u8),
    Fixed(Cents),
}

impl Default for Commission {
    fn default() -> Self {
        Commission::Percentage(DEFAULT_COMMISSION_PERCENT)
    }
}

impl Commission {
    /// Commission owed on a sale, rounded down to the cent.
    pub fn amount_for(self, sale: Cents) -> Cents {
        match self {
            Commission::Percentage(percent) => {
                Cents((u128::from(sale.0) * u128::from(percent) / 100) as u64)
            }
            Commission::Fixed(amount) => amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliate {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub email: String,
    pub commission: Commission,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewAffiliate {
    pub email: String,
    #[serde(default)]
    pub commission: Commission,
}

impl Affiliate {
    pub fn create(
        input: NewAffiliate,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let email = input.email.trim().to_lowercase();
        if !looks_like_email(&email) {
            errors.push("email", "Invalid email");
        }
        if let Commission::Percentage(percent) = input.commission {
            if percent > 100 {
                errors.push("commission", "Commission must be between 0% and 100%");
            }
        }
        errors.into_result()?;

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            email,
            commission: input.commission,
            created_at: now,
        })
    }
}

pub(crate) fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((user, domain)) => {
            !user.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}
