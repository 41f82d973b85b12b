use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
    error::CampaignError,
    fees::{self, FeeQuote, PaymentMethod},
    money::Cents,
    validation::validate_campaign,
};

/// Unpaid drafts are cancelled after this window.
pub const DRAFT_TTL: Duration = Duration::days(2);
pub const CAMPAIGN_LENGTH: Duration = Duration::days(30);

pub const DEFAULT_PAYMENT_DEADLINE_HOURS: u32 = 24;
pub const DEFAULT_MIN_PER_PURCHASE: u32 = 1;
pub const DEFAULT_MAX_PER_PURCHASE: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawMethod {
    #[serde(rename = "Loteria Federal")]
    LoteriaFederal,
    #[serde(rename = "Sorteador.com.br")]
    Sorteador,
    #[serde(rename = "Live no Instagram")]
    LiveInstagram,
    #[serde(rename = "Live no Youtube")]
    LiveYoutube,
    #[serde(rename = "Live no TikTok")]
    LiveTikTok,
    #[serde(rename = "Outros")]
    Other,
}

impl DrawMethod {
    pub const ALL: [DrawMethod; 6] = [
        DrawMethod::LoteriaFederal,
        DrawMethod::Sorteador,
        DrawMethod::LiveInstagram,
        DrawMethod::LiveYoutube,
        DrawMethod::LiveTikTok,
        DrawMethod::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DrawMethod::LoteriaFederal => "Loteria Federal",
            DrawMethod::Sorteador => "Sorteador.com.br",
            DrawMethod::LiveInstagram => "Live no Instagram",
            DrawMethod::LiveYoutube => "Live no Youtube",
            DrawMethod::LiveTikTok => "Live no TikTok",
            DrawMethod::Other => "Outros",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialFilter {
    #[default]
    All,
    Available,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignModel {
    #[default]
    Manual,
    Automatic,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub quote: FeeQuote,
    pub paid_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub prize_image_urls: Vec<String>,
    pub ticket_price: Cents,
    pub total_tickets: u32,
    pub sold_tickets: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CampaignStatus,
    pub winner_ticket_number: Option<u32>,
    pub winner_user_id: Option<Uuid>,
    pub draw_method: DrawMethod,
    pub phone_number: String,
    pub draw_date: Option<DateTime<Utc>>,
    pub payment_deadline_hours: u32,
    pub require_email: bool,
    pub show_ranking: bool,
    pub min_tickets_per_purchase: u32,
    pub max_tickets_per_purchase: u32,
    pub initial_filter: InitialFilter,
    pub campaign_model: CampaignModel,
    pub expires_at: Option<DateTime<Utc>>,
    pub publication: Option<Publication>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_deadline() -> u32 {
    DEFAULT_PAYMENT_DEADLINE_HOURS
}

fn default_min() -> u32 {
    DEFAULT_MIN_PER_PURCHASE
}

fn default_true() -> bool {
    true
}

/// Create payload. An omitted `max_tickets_per_purchase` resolves to
/// `min(1000, total_tickets)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ticket_price: Cents,
    pub total_tickets: u32,
    pub draw_method: DrawMethod,
    pub phone_number: String,
    #[serde(default)]
    pub draw_date: Option<DateTime<Utc>>,
    #[serde(default = "default_deadline")]
    pub payment_deadline_hours: u32,
    #[serde(default = "default_true")]
    pub require_email: bool,
    #[serde(default)]
    pub show_ranking: bool,
    #[serde(default = "default_min")]
    pub min_tickets_per_purchase: u32,
    #[serde(default)]
    pub max_tickets_per_purchase: Option<u32>,
    #[serde(default)]
    pub initial_filter: InitialFilter,
    #[serde(default)]
    pub campaign_model: CampaignModel,
    #[serde(default)]
    pub prize_image_urls: Vec<String>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update. Nullable fields use `Some(None)` to clear.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CampaignPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub ticket_price: Option<Cents>,
    pub total_tickets: Option<u32>,
    pub draw_method: Option<DrawMethod>,
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub draw_date: Option<Option<DateTime<Utc>>>,
    pub payment_deadline_hours: Option<u32>,
    pub require_email: Option<bool>,
    pub show_ranking: Option<bool>,
    pub min_tickets_per_purchase: Option<u32>,
    pub max_tickets_per_purchase: Option<u32>,
    pub initial_filter: Option<InitialFilter>,
    pub campaign_model: Option<CampaignModel>,
}

impl CampaignPatch {
    /// Fields that change what buyers already paid for.
    fn locked_field(&self) -> Option<&'static str> {
        [
            ("ticket_price", self.ticket_price.is_some()),
            ("total_tickets", self.total_tickets.is_some()),
            ("draw_method", self.draw_method.is_some()),
            ("payment_deadline_hours", self.payment_deadline_hours.is_some()),
            ("require_email", self.require_email.is_some()),
            ("min_tickets_per_purchase", self.min_tickets_per_purchase.is_some()),
            ("max_tickets_per_purchase", self.max_tickets_per_purchase.is_some()),
            ("campaign_model", self.campaign_model.is_some()),
        ]
        .into_iter()
        .find_map(|(field, set)| set.then_some(field))
    }
}

impl Campaign {
    pub fn create(
        input: NewCampaign,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, CampaignError> {
        let max_tickets_per_purchase = input
            .max_tickets_per_purchase
            .unwrap_or_else(|| DEFAULT_MAX_PER_PURCHASE.min(input.total_tickets.max(1)));

        let campaign = Self {
            id: Uuid::new_v4(),
            user_id,
            title: input.title.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            prize_image_urls: input.prize_image_urls,
            ticket_price: input.ticket_price,
            total_tickets: input.total_tickets,
            sold_tickets: 0,
            start_date: now,
            end_date: now + CAMPAIGN_LENGTH,
            status: CampaignStatus::Draft,
            winner_ticket_number: None,
            winner_user_id: None,
            draw_method: input.draw_method,
            phone_number: input.phone_number.trim().to_string(),
            draw_date: input.draw_date,
            payment_deadline_hours: input.payment_deadline_hours,
            require_email: input.require_email,
            show_ranking: input.show_ranking,
            min_tickets_per_purchase: input.min_tickets_per_purchase,
            max_tickets_per_purchase,
            initial_filter: input.initial_filter,
            campaign_model: input.campaign_model,
            expires_at: Some(now + DRAFT_TTL),
            publication: None,
            created_at: now,
            updated_at: now,
        };

        validate_campaign(&campaign)?;

        Ok(campaign)
    }

    /// Merges `patch` into a copy and validates the merged result.
    pub fn apply(&self, patch: CampaignPatch, now: DateTime<Utc>) -> Result<Self, CampaignError> {
        match self.status {
            CampaignStatus::Draft => {}
            CampaignStatus::Active => {
                if let Some(field) = patch.locked_field() {
                    return Err(CampaignError::Locked(field));
                }
            }
            from => {
                return Err(CampaignError::InvalidTransition {
                    from,
                    action: "edit",
                });
            }
        }

        let mut next = self.clone();

        if let Some(title) = patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            next.description = description.filter(|d| !d.trim().is_empty());
        }
        if let Some(price) = patch.ticket_price {
            next.ticket_price = price;
        }
        if let Some(total) = patch.total_tickets {
            next.total_tickets = total;
        }
        if let Some(method) = patch.draw_method {
            next.draw_method = method;
        }
        if let Some(phone) = patch.phone_number {
            next.phone_number = phone.trim().to_string();
        }
        if let Some(draw_date) = patch.draw_date {
            next.draw_date = draw_date;
        }
        if let Some(hours) = patch.payment_deadline_hours {
            next.payment_deadline_hours = hours;
        }
        if let Some(require_email) = patch.require_email {
            next.require_email = require_email;
        }
        if let Some(show_ranking) = patch.show_ranking {
            next.show_ranking = show_ranking;
        }
        if let Some(min) = patch.min_tickets_per_purchase {
            next.min_tickets_per_purchase = min;
        }
        if let Some(max) = patch.max_tickets_per_purchase {
            next.max_tickets_per_purchase = max;
        }
        if let Some(filter) = patch.initial_filter {
            next.initial_filter = filter;
        }
        if let Some(model) = patch.campaign_model {
            next.campaign_model = model;
        }

        validate_campaign(&next)?;
        next.updated_at = now;

        Ok(next)
    }

    pub fn quote(&self, method: PaymentMethod) -> FeeQuote {
        FeeQuote::new(self.total_tickets, self.ticket_price, method)
    }

    pub fn is_expired_draft(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Draft && self.expires_at.is_some_and(|at| at <= now)
    }

    /// Records the publication fee payment and opens the campaign.
    pub fn publish(
        &mut self,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<FeeQuote, CampaignError> {
        if self.status != CampaignStatus::Draft {
            return Err(CampaignError::InvalidTransition {
                from: self.status,
                action: "publish",
            });
        }
        if self.is_expired_draft(now) {
            return Err(CampaignError::DraftExpired);
        }

        let quote = self.quote(method);

        self.status = CampaignStatus::Active;
        self.start_date = now;
        self.end_date = now + CAMPAIGN_LENGTH;
        self.expires_at = None;
        self.publication = Some(Publication {
            quote,
            paid_at: now,
        });
        self.updated_at = now;

        Ok(quote)
    }

    pub fn complete(
        &mut self,
        winner_ticket_number: u32,
        winner_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(), CampaignError> {
        if self.status != CampaignStatus::Active {
            return Err(CampaignError::InvalidTransition {
                from: self.status,
                action: "draw",
            });
        }
        if winner_ticket_number == 0 || winner_ticket_number > self.total_tickets {
            return Err(CampaignError::OutOfRange(winner_ticket_number));
        }

        self.status = CampaignStatus::Completed;
        self.winner_ticket_number = Some(winner_ticket_number);
        self.winner_user_id = winner_user_id;
        self.updated_at = now;

        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), CampaignError> {
        match self.status {
            CampaignStatus::Draft | CampaignStatus::Active => {
                self.status = CampaignStatus::Cancelled;
                self.expires_at = None;
                self.updated_at = now;
                Ok(())
            }
            from => Err(CampaignError::InvalidTransition {
                from,
                action: "cancel",
            }),
        }
    }

    pub fn estimated_revenue(&self) -> Cents {
        fees::estimated_revenue(self.total_tickets, self.ticket_price)
    }

    /// Value of tickets sold so far.
    pub fn collected(&self) -> Cents {
        fees::estimated_revenue(self.sold_tickets, self.ticket_price)
    }

    pub fn remaining_tickets(&self) -> u32 {
        self.total_tickets.saturating_sub(self.sold_tickets)
    }
}
