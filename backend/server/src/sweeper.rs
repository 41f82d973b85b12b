//! # Sweeper
//!
//! Periodic cleanup:
//! - unpaid drafts past `expires_at` are cancelled
//! - reservations past their payment deadline give their numbers back
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use raffle::{Campaign, CampaignStatus};
use tokio::{task::JoinHandle, time::interval};
use tracing::{error, info};

use crate::{error::StoreError, state::AppState, store::Store};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_drafts: usize,
    pub released_tickets: usize,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.expired_drafts += other.expired_drafts;
        self.released_tickets += other.released_tickets;
    }
}

pub async fn release_expired<S: Store>(
    store: &S,
    campaign: &Campaign,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let expired: Vec<_> = store
        .tickets(campaign.id)
        .await?
        .into_iter()
        .filter(|t| t.is_expired(now))
        .collect();

    store.release(campaign.id, &expired).await
}

pub async fn sweep_campaign<S: Store>(
    store: &S,
    campaign: &Campaign,
    now: DateTime<Utc>,
) -> Result<SweepReport, StoreError> {
    let mut report = SweepReport::default();

    if campaign.is_expired_draft(now) {
        let mut expired = campaign.clone();
        // a draft paid for after the listing was read keeps its new state
        if expired.cancel(now).is_ok() && store.replace_campaign(campaign, &expired).await? {
            info!("Draft {} expired unpaid", campaign.id);
            report.expired_drafts = 1;
        }
    } else if campaign.status == CampaignStatus::Active {
        report.released_tickets = release_expired(store, campaign, now).await?;
    }

    Ok(report)
}

pub async fn sweep<S: Store>(store: &S, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
    let mut report = SweepReport::default();

    for campaign in store.campaigns().await? {
        report.merge(sweep_campaign(store, &campaign, now).await?);
    }

    Ok(report)
}

pub fn spawn_sweeper<S: Store>(state: Arc<AppState<S>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);

        loop {
            ticker.tick().await;

            match sweep(&state.store, Utc::now()).await {
                Ok(report) if report != SweepReport::default() => {
                    info!(
                        "Sweep cancelled {} drafts and released {} tickets",
                        report.expired_drafts, report.released_tickets
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Sweep failed: {e}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use raffle::{
        NewCampaign,
        fees::PaymentMethod,
        ticket::{Buyer, Ticket},
    };
    use uuid::Uuid;

    use super::*;
    use crate::memory::MemoryStore;

    fn input() -> NewCampaign {
        serde_json::from_value(serde_json::json!({
            "title": "Rifa do carro",
            "ticket_price": 500,
            "total_tickets": 100,
            "draw_method": "Loteria Federal",
            "phone_number": "(11) 99999-8888"
        }))
        .unwrap()
    }

    fn buyer() -> Buyer {
        Buyer {
            name: "Ana".to_string(),
            email: None,
            phone: "11999998888".to_string(),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_sweep_cancels_expired_drafts() {
        let store = MemoryStore::new();
        let created = Utc::now() - ChronoDuration::days(3);
        let draft = Campaign::create(input(), Uuid::new_v4(), created).unwrap();
        store.save_campaign(&draft).await.unwrap();

        let report = sweep(&store, Utc::now()).await.unwrap();
        assert_eq!(report.expired_drafts, 1);

        let stored = store.campaign(draft.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_sweep_keeps_draft_published_meanwhile() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let created = now - ChronoDuration::days(3);
        let listed = Campaign::create(input(), Uuid::new_v4(), created).unwrap();
        let mut published = listed.clone();
        published
            .publish(PaymentMethod::Pix, created + ChronoDuration::hours(1))
            .unwrap();
        store.save_campaign(&published).await.unwrap();

        let report = sweep_campaign(&store, &listed, now).await.unwrap();
        assert_eq!(report.expired_drafts, 0);

        let stored = store.campaign(listed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Active);
    }

    #[tokio::test]
    async fn test_sweep_releases_expired_reservations() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut campaign = Campaign::create(input(), Uuid::new_v4(), now).unwrap();
        campaign.publish(PaymentMethod::Pix, now).unwrap();
        store.save_campaign(&campaign).await.unwrap();

        let old = Ticket::reserve(1, buyer(), 24, now - ChronoDuration::hours(25));
        let fresh = Ticket::reserve(2, buyer(), 24, now);
        let mut paid = Ticket::reserve(3, buyer(), 24, now - ChronoDuration::hours(30));
        paid.confirm(now - ChronoDuration::hours(29));
        store.reserve(campaign.id, &[old, fresh, paid]).await.unwrap();

        let report = sweep(&store, now).await.unwrap();
        assert_eq!(report.released_tickets, 1);

        let mut left: Vec<u32> = store
            .tickets(campaign.id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.number)
            .collect();
        left.sort_unstable();
        assert_eq!(left, vec![2, 3]);
    }
}
