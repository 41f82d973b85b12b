//! # Campaign Validation
//!
//! Field rules evaluated before anything reaches the store. Every failed rule
//! is collected so the dashboard can flag all fields at once.
//!
//! ## Rules
//! - title: 3 to 100 characters after trimming
//! - description: at most 2000 characters
//! - ticket_price: R$ 0,01 to R$ 10.000,00
//! - total_tickets: 1 to 10 million
//! - phone_number: 10 to 20 characters of digits, spaces, `-`, `(`, `)` and `+`
//! - payment_deadline_hours: 1 to 168 (7 days)
//! - min/max tickets per purchase: at least 1, `min <= max <= total_tickets`
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::{
    campaign::{Campaign, CampaignModel, DrawMethod, InitialFilter, NewCampaign},
    error::ValidationErrors,
    money::Cents,
};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 2000;
pub const PRICE_MIN: Cents = Cents(1);
pub const PRICE_MAX: Cents = Cents::reais(10_000);
pub const TICKETS_MAX: u32 = 10_000_000;
pub const PHONE_MIN: usize = 10;
pub const PHONE_MAX: usize = 20;
pub const DEADLINE_MAX_HOURS: u32 = 168;

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-\(\)\+]+$").expect("static regex"));

pub fn validate_campaign(campaign: &Campaign) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title_len = campaign.title.trim().chars().count();
    if title_len < TITLE_MIN {
        errors.push("title", format!("Title must have at least {TITLE_MIN} characters"));
    } else if title_len > TITLE_MAX {
        errors.push("title", format!("Title must have at most {TITLE_MAX} characters"));
    }

    if let Some(description) = &campaign.description {
        if description.chars().count() > DESCRIPTION_MAX {
            errors.push(
                "description",
                format!("Description must have at most {DESCRIPTION_MAX} characters"),
            );
        }
    }

    if campaign.ticket_price < PRICE_MIN {
        errors.push("ticket_price", "Ticket price must be greater than R$ 0,00");
    } else if campaign.ticket_price > PRICE_MAX {
        errors.push("ticket_price", format!("Ticket price must be at most {PRICE_MAX}"));
    }

    if campaign.total_tickets < 1 {
        errors.push("total_tickets", "There must be at least 1 ticket");
    } else if campaign.total_tickets > TICKETS_MAX {
        errors.push("total_tickets", "At most 10 million tickets");
    }

    check_phone(&mut errors, &campaign.phone_number);

    if !(1..=DEADLINE_MAX_HOURS).contains(&campaign.payment_deadline_hours) {
        errors.push(
            "payment_deadline_hours",
            format!("Payment deadline must be between 1 and {DEADLINE_MAX_HOURS} hours"),
        );
    }

    let (min, max) = (
        campaign.min_tickets_per_purchase,
        campaign.max_tickets_per_purchase,
    );
    if min < 1 {
        errors.push("min_tickets_per_purchase", "Minimum must be at least 1");
    }
    if max < 1 {
        errors.push("max_tickets_per_purchase", "Maximum must be at least 1");
    }
    if min > max {
        errors.push(
            "min_tickets_per_purchase",
            "Minimum per purchase must not exceed the maximum",
        );
    }
    if max > campaign.total_tickets {
        errors.push(
            "max_tickets_per_purchase",
            "Maximum per purchase cannot exceed the total number of tickets",
        );
    }

    errors.into_result()
}

fn check_phone(errors: &mut ValidationErrors, phone: &str) {
    let len = phone.chars().count();

    if len < PHONE_MIN {
        errors.push("phone_number", "Invalid phone number");
    } else if len > PHONE_MAX {
        errors.push("phone_number", "Phone number too long");
    } else if !PHONE.is_match(phone) {
        errors.push("phone_number", "Invalid phone format");
    }
}

/// Dashboard form shape: camelCase keys and the price typed as `1,50`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignForm {
    pub title: String,
    pub ticket_quantity: u32,
    pub ticket_price: String,
    pub draw_method: String,
    pub phone_number: String,
    #[serde(default)]
    pub draw_date: Option<DateTime<Utc>>,
    pub payment_deadline_hours: u32,
    pub require_email: bool,
    pub show_ranking: bool,
    pub min_tickets_per_purchase: u32,
    pub max_tickets_per_purchase: u32,
    pub initial_filter: InitialFilter,
    pub campaign_model: CampaignModel,
}

impl CampaignForm {
    /// Checks the form-only rules (price text, draw method label) and converts.
    /// Range rules run again when the campaign is built.
    pub fn into_new_campaign(self) -> Result<NewCampaign, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let ticket_price = match Cents::parse_form(&self.ticket_price) {
            Ok(price) => Some(price),
            Err(_) => {
                errors.push("ticketPrice", "Invalid price format (ex: 1,50)");
                None
            }
        };

        let draw_method = if self.draw_method.trim().is_empty() {
            errors.push("drawMethod", "Select a draw method");
            None
        } else {
            let method = DrawMethod::from_label(&self.draw_method);
            if method.is_none() {
                errors.push("drawMethod", "Select a valid draw method");
            }
            method
        };

        let (Some(ticket_price), Some(draw_method)) = (ticket_price, draw_method) else {
            return Err(errors);
        };

        Ok(NewCampaign {
            title: self.title,
            description: None,
            ticket_price,
            total_tickets: self.ticket_quantity,
            draw_method,
            phone_number: self.phone_number,
            draw_date: self.draw_date,
            payment_deadline_hours: self.payment_deadline_hours,
            require_email: self.require_email,
            show_ranking: self.show_ranking,
            min_tickets_per_purchase: self.min_tickets_per_purchase,
            max_tickets_per_purchase: Some(self.max_tickets_per_purchase),
            initial_filter: self.initial_filter,
            campaign_model: self.campaign_model,
            prize_image_urls: Vec::new(),
        })
    }
}
