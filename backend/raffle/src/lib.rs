//! # Raffle Domain
//!
//! Everything about a campaign that does not need the network: money, the
//! publication fee table, campaign rules, the quota board and buyer orders.
//!
//! ## Lifecycle
//!
//! ```text
//! draft ──publish──▶ active ──draw──▶ completed
//!   │                  │
//!   └──────cancel──────┴──▶ cancelled
//! ```
//!
//! - Drafts expire 2 days after creation if the publication fee is not paid
//! - Active campaigns run for 30 days
//! - Reservations hold numbers until the campaign's payment deadline
//!
//! ## Notes
//! - Money is always integer cents. The dashboard's `1,50` format is parsed at the edge.
//! - Ticket numbers are 1-based.

pub mod affiliate;
pub mod campaign;
pub mod error;
pub mod fees;
pub mod image;
pub mod money;
pub mod profile;
pub mod quota;
pub mod ranking;
pub mod stats;
pub mod ticket;
pub mod validation;

pub use campaign::{Campaign, CampaignModel, CampaignPatch, CampaignStatus, NewCampaign};
pub use error::{CampaignError, ImageError, ValidationErrors};
pub use money::Cents;
