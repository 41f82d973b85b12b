use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    campaign::{Campaign, CampaignModel, CampaignStatus},
    error::CampaignError,
    money::Cents,
    quota::QuotaBoard,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Reserved,
    Purchased,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: u32,
    pub status: TicketStatus,
    pub buyer: Buyer,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub purchased_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn reserve(number: u32, buyer: Buyer, deadline_hours: u32, now: DateTime<Utc>) -> Self {
        Self {
            number,
            status: TicketStatus::Reserved,
            buyer,
            reserved_at: now,
            expires_at: now + Duration::hours(i64::from(deadline_hours)),
            purchased_at: None,
        }
    }

    /// Unpaid past the campaign's payment deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == TicketStatus::Reserved && self.expires_at <= now
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) {
        self.status = TicketStatus::Purchased;
        self.purchased_at = Some(now);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Selection {
    Manual { numbers: Vec<u32> },
    Automatic { quantity: u32 },
}

impl Selection {
    pub fn count(&self) -> u32 {
        match self {
            Selection::Manual { numbers } => numbers.len() as u32,
            Selection::Automatic { quantity } => *quantity,
        }
    }

    pub fn model(&self) -> CampaignModel {
        match self {
            Selection::Manual { .. } => CampaignModel::Manual,
            Selection::Automatic { .. } => CampaignModel::Automatic,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Order {
    pub buyer: Buyer,
    pub selection: Selection,
}

/// Rules an order must pass before any number is locked.
pub fn check_order(campaign: &Campaign, order: &Order) -> Result<(), CampaignError> {
    if campaign.status != CampaignStatus::Active {
        return Err(CampaignError::NotActive);
    }

    if order.selection.model() != campaign.campaign_model {
        return Err(CampaignError::ModelMismatch {
            expected: campaign.campaign_model,
        });
    }

    let buyer = &order.buyer;
    if buyer.name.trim().is_empty() {
        return Err(CampaignError::MissingBuyerField("name"));
    }
    if buyer.phone.trim().is_empty() {
        return Err(CampaignError::MissingBuyerField("phone"));
    }
    if campaign.require_email && buyer.email.as_deref().is_none_or(|e| e.trim().is_empty()) {
        return Err(CampaignError::EmailRequired);
    }

    let requested = order.selection.count();
    let (min, max) = (
        campaign.min_tickets_per_purchase,
        campaign.max_tickets_per_purchase,
    );
    if requested < min || requested > max {
        return Err(CampaignError::PurchaseSize {
            min,
            max,
            requested,
        });
    }

    if let Selection::Manual { numbers } = &order.selection {
        let mut seen = BTreeSet::new();
        for &number in numbers {
            if number == 0 || number > campaign.total_tickets {
                return Err(CampaignError::OutOfRange(number));
            }
            if !seen.insert(number) {
                return Err(CampaignError::Duplicate(number));
            }
        }
    }

    Ok(())
}

/// Amount due for `count` tickets.
pub fn order_total(campaign: &Campaign, count: u32) -> Cents {
    campaign
        .ticket_price
        .times(u64::from(count))
        .unwrap_or(Cents(u64::MAX))
}

/// Board of persisted tickets. Expired reservations count as available.
pub fn board_from(total: u32, tickets: &[Ticket], now: DateTime<Utc>) -> QuotaBoard {
    let mut board = QuotaBoard::new(total);

    for ticket in tickets {
        match ticket.status {
            TicketStatus::Purchased => {
                board.purchased.insert(ticket.number);
            }
            TicketStatus::Reserved if !ticket.is_expired(now) => {
                board.reserved.insert(ticket.number);
            }
            TicketStatus::Reserved => {}
        }
    }

    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        campaign::tests::{active_campaign, now},
        quota::QuotaStatus,
    };

    fn buyer() -> Buyer {
        Buyer {
            name: "Maria".to_string(),
            email: Some("maria@example.com".to_string()),
            phone: "11999990000".to_string(),
            user_id: None,
        }
    }

    fn manual(numbers: Vec<u32>) -> Order {
        Order {
            buyer: buyer(),
            selection: Selection::Manual { numbers },
        }
    }

    #[test]
    fn test_reservation_deadline() {
        let ticket = Ticket::reserve(7, buyer(), 24, now());

        assert_eq!(ticket.expires_at, now() + Duration::hours(24));
        assert!(!ticket.is_expired(now() + Duration::hours(23)));
        assert!(ticket.is_expired(now() + Duration::hours(24)));
    }

    #[test]
    fn test_purchased_never_expires() {
        let mut ticket = Ticket::reserve(7, buyer(), 1, now());
        ticket.confirm(now());

        assert_eq!(ticket.status, TicketStatus::Purchased);
        assert!(!ticket.is_expired(now() + Duration::days(30)));
    }

    #[test]
    fn test_check_order_accepts_valid_manual() {
        assert!(check_order(&active_campaign(), &manual(vec![1, 2, 3])).is_ok());
    }

    #[test]
    fn test_check_order_requires_active() {
        let mut campaign = active_campaign();
        campaign.cancel(now()).unwrap();

        assert_eq!(
            check_order(&campaign, &manual(vec![1])),
            Err(CampaignError::NotActive)
        );
    }

    #[test]
    fn test_check_order_model_mismatch() {
        let order = Order {
            buyer: buyer(),
            selection: Selection::Automatic { quantity: 3 },
        };

        assert_eq!(
            check_order(&active_campaign(), &order),
            Err(CampaignError::ModelMismatch {
                expected: CampaignModel::Manual
            })
        );
    }

    #[test]
    fn test_check_order_numbers() {
        let campaign = active_campaign();

        assert_eq!(
            check_order(&campaign, &manual(vec![0])),
            Err(CampaignError::OutOfRange(0))
        );
        assert_eq!(
            check_order(&campaign, &manual(vec![101])),
            Err(CampaignError::OutOfRange(101))
        );
        assert_eq!(
            check_order(&campaign, &manual(vec![4, 4])),
            Err(CampaignError::Duplicate(4))
        );
    }

    #[test]
    fn test_check_order_purchase_size() {
        let mut campaign = active_campaign();
        campaign.min_tickets_per_purchase = 2;
        campaign.max_tickets_per_purchase = 3;

        assert!(matches!(
            check_order(&campaign, &manual(vec![1])),
            Err(CampaignError::PurchaseSize { requested: 1, .. })
        ));
        assert!(matches!(
            check_order(&campaign, &manual(vec![1, 2, 3, 4])),
            Err(CampaignError::PurchaseSize { requested: 4, .. })
        ));
    }

    #[test]
    fn test_check_order_email() {
        let mut order = manual(vec![1]);
        order.buyer.email = None;

        assert_eq!(
            check_order(&active_campaign(), &order),
            Err(CampaignError::EmailRequired)
        );

        let mut campaign = active_campaign();
        campaign.require_email = false;
        assert!(check_order(&campaign, &order).is_ok());
    }

    #[test]
    fn test_board_skips_expired_reservations() {
        let mut paid = Ticket::reserve(1, buyer(), 1, now());
        paid.confirm(now());
        let fresh = Ticket::reserve(2, buyer(), 24, now());
        let stale = Ticket::reserve(3, buyer(), 1, now());

        let board = board_from(100, &[paid, fresh, stale], now() + Duration::hours(2));

        assert_eq!(board.status(1), QuotaStatus::Purchased);
        assert_eq!(board.status(2), QuotaStatus::Reserved);
        assert_eq!(board.status(3), QuotaStatus::Available);
    }

    #[test]
    fn test_selection_json() {
        let selection: Selection =
            serde_json::from_str(r#"{ "mode": "automatic", "quantity": 15 }"#).unwrap();
        assert_eq!(selection, Selection::Automatic { quantity: 15 });
        assert_eq!(selection.count(), 15);
    }
}
