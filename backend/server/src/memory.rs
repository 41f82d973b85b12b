//! In-process [`Store`] used by tests and local runs without Redis.
use std::collections::{BTreeMap, HashMap};

use raffle::{Campaign, affiliate::Affiliate, profile::Profile, ticket::Ticket};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    store::{Store, TicketSwap},
};

#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<Uuid, Profile>>,
    campaigns: RwLock<HashMap<Uuid, Campaign>>,
    tickets: RwLock<HashMap<Uuid, BTreeMap<u32, Ticket>>>,
    affiliates: RwLock<HashMap<Uuid, Affiliate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.profiles.write().await.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.profiles.read().await.values().cloned().collect())
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.profiles.write().await.remove(&id).is_some())
    }

    async fn save_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        self.campaigns.write().await.insert(campaign.id, campaign.clone());
        Ok(())
    }

    async fn replace_campaign(
        &self,
        expected: &Campaign,
        updated: &Campaign,
    ) -> Result<bool, StoreError> {
        let mut campaigns = self.campaigns.write().await;

        match campaigns.get_mut(&expected.id) {
            Some(stored) if stored == expected => {
                *stored = updated.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        Ok(self.campaigns.read().await.get(&id).cloned())
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        Ok(self.campaigns.read().await.values().cloned().collect())
    }

    async fn user_campaigns(&self, user_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        Ok(self
            .campaigns
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.campaigns.write().await.remove(&id).is_some();
        self.tickets.write().await.remove(&id);

        Ok(removed)
    }

    async fn tickets(&self, campaign_id: Uuid) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .tickets
            .read()
            .await
            .get(&campaign_id)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn reserve(&self, campaign_id: Uuid, tickets: &[Ticket]) -> Result<(), StoreError> {
        let mut all = self.tickets.write().await;
        let board = all.entry(campaign_id).or_default();

        let taken: Vec<u32> = tickets
            .iter()
            .map(|t| t.number)
            .filter(|n| board.contains_key(n))
            .collect();

        if !taken.is_empty() {
            return Err(StoreError::Taken(taken));
        }

        for ticket in tickets {
            board.insert(ticket.number, ticket.clone());
        }

        Ok(())
    }

    async fn swap_tickets(
        &self,
        campaign_id: Uuid,
        swaps: &[TicketSwap],
    ) -> Result<(), StoreError> {
        let mut all = self.tickets.write().await;
        let board = all.entry(campaign_id).or_default();

        let changed: Vec<u32> = swaps
            .iter()
            .filter(|(expected, _)| board.get(&expected.number) != Some(expected))
            .map(|(expected, _)| expected.number)
            .collect();

        if !changed.is_empty() {
            return Err(StoreError::Changed(changed));
        }

        for (_, updated) in swaps {
            board.insert(updated.number, updated.clone());
        }

        Ok(())
    }

    async fn release(&self, campaign_id: Uuid, tickets: &[Ticket]) -> Result<usize, StoreError> {
        let mut all = self.tickets.write().await;
        let Some(board) = all.get_mut(&campaign_id) else {
            return Ok(0);
        };

        let mut released = 0;
        for ticket in tickets {
            if board.get(&ticket.number) == Some(ticket) {
                board.remove(&ticket.number);
                released += 1;
            }
        }

        Ok(released)
    }

    async fn save_affiliate(&self, affiliate: &Affiliate) -> Result<(), StoreError> {
        self.affiliates.write().await.insert(affiliate.id, affiliate.clone());
        Ok(())
    }

    async fn affiliates(&self, owner_id: Uuid) -> Result<Vec<Affiliate>, StoreError> {
        Ok(self
            .affiliates
            .read()
            .await
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_affiliate(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut affiliates = self.affiliates.write().await;

        match affiliates.get(&id) {
            Some(a) if a.owner_id == owner_id => {
                affiliates.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use raffle::ticket::Buyer;

    use super::*;

    fn buyer() -> Buyer {
        Buyer {
            name: "Ana".to_string(),
            email: None,
            phone: "11999998888".to_string(),
            user_id: None,
        }
    }

    fn ticket(number: u32) -> Ticket {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        Ticket::reserve(number, buyer(), 24, now)
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let store = MemoryStore::new();
        let campaign = Uuid::new_v4();

        store.reserve(campaign, &[ticket(1), ticket(2)]).await.unwrap();

        let err = store
            .reserve(campaign, &[ticket(2), ticket(3)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Taken(n) if n == vec![2]));

        let numbers: Vec<u32> = store
            .tickets(campaign)
            .await
            .unwrap()
            .iter()
            .map(|t| t.number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_release_skips_changed_tickets() {
        let store = MemoryStore::new();
        let campaign = Uuid::new_v4();
        let stale = ticket(1);

        store.reserve(campaign, &[stale.clone(), ticket(2)]).await.unwrap();

        let mut confirmed = stale.clone();
        confirmed.confirm(Utc::now());
        store
            .swap_tickets(campaign, &[(stale.clone(), confirmed)])
            .await
            .unwrap();

        let released = store.release(campaign, &[stale, ticket(2)]).await.unwrap();
        assert_eq!(released, 1);
        assert_eq!(store.tickets(campaign).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_swap_refuses_replaced_reservation() {
        let store = MemoryStore::new();
        let campaign = Uuid::new_v4();
        let first = ticket(5);

        store.reserve(campaign, &[first.clone(), ticket(6)]).await.unwrap();
        let snapshot = store.tickets(campaign).await.unwrap();

        // the first hold lapses and another buyer takes the number
        store.release(campaign, &[first.clone()]).await.unwrap();
        let mut second = ticket(5);
        second.buyer.name = "Bruno".to_string();
        store.reserve(campaign, &[second.clone()]).await.unwrap();

        let swaps: Vec<_> = snapshot
            .into_iter()
            .map(|t| {
                let mut paid = t.clone();
                paid.confirm(Utc::now());
                (t, paid)
            })
            .collect();
        let err = store.swap_tickets(campaign, &swaps).await.unwrap_err();
        assert!(matches!(err, StoreError::Changed(n) if n == vec![5]));

        let tickets = store.tickets(campaign).await.unwrap();
        assert_eq!(tickets[0], second);
        assert_eq!(tickets[1], ticket(6));
    }

    #[tokio::test]
    async fn test_replace_campaign_is_compare_and_set() {
        let store = MemoryStore::new();
        let input = serde_json::from_value(serde_json::json!({
            "title": "Rifa da Bike",
            "ticket_price": 500,
            "total_tickets": 100,
            "draw_method": "Loteria Federal",
            "phone_number": "(11) 99999-8888"
        }))
        .unwrap();
        let stale = Campaign::create(input, Uuid::new_v4(), Utc::now()).unwrap();
        store.save_campaign(&stale).await.unwrap();

        let mut first = stale.clone();
        first.title = "Primeira".to_string();
        let mut second = stale.clone();
        second.title = "Segunda".to_string();

        assert!(store.replace_campaign(&stale, &first).await.unwrap());
        assert!(!store.replace_campaign(&stale, &second).await.unwrap());
        assert_eq!(store.campaign(stale.id).await.unwrap().unwrap().title, "Primeira");
    }

    #[tokio::test]
    async fn test_delete_affiliate_checks_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let affiliate = Affiliate {
            id: Uuid::new_v4(),
            owner_id: owner,
            email: "parceiro@example.com".to_string(),
            commission: Default::default(),
            created_at: Utc::now(),
        };

        store.save_affiliate(&affiliate).await.unwrap();

        assert!(!store.delete_affiliate(Uuid::new_v4(), affiliate.id).await.unwrap());
        assert!(store.delete_affiliate(owner, affiliate.id).await.unwrap());
        assert!(store.affiliates(owner).await.unwrap().is_empty());
    }
}
