//! # Store
//!
//! Persistence seam. Production runs on Redis ([`crate::database::RedisStore`]),
//! tests on [`crate::memory::MemoryStore`].
//!
//! Both keep the same guarantees:
//! - `reserve` is all-or-nothing and fails with [`StoreError::Taken`] listing the held numbers
//! - `swap_tickets` is all-or-nothing and fails with [`StoreError::Changed`] when any
//!   stored record differs from the expected one
//! - `release` only drops a ticket whose stored record still equals the one passed in,
//!   so a reservation confirmed or replaced in the meantime survives
//! - `replace_campaign` writes only over the exact record that was read
use raffle::{Campaign, affiliate::Affiliate, profile::Profile, ticket::Ticket};
use uuid::Uuid;

use crate::error::StoreError;

/// Stored record the caller read, and what should replace it.
pub type TicketSwap = (Ticket, Ticket);

pub trait Store: Send + Sync + 'static {
    fn save_profile(
        &self,
        profile: &Profile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn profile(&self, id: Uuid) -> impl Future<Output = Result<Option<Profile>, StoreError>> + Send;

    fn profiles(&self) -> impl Future<Output = Result<Vec<Profile>, StoreError>> + Send;

    fn delete_profile(&self, id: Uuid) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Insert or replace.
    fn save_campaign(
        &self,
        campaign: &Campaign,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Compare-and-set. `false` when the stored record is no longer `expected`.
    fn replace_campaign(
        &self,
        expected: &Campaign,
        updated: &Campaign,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn campaign(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Campaign>, StoreError>> + Send;

    fn campaigns(&self) -> impl Future<Output = Result<Vec<Campaign>, StoreError>> + Send;

    fn user_campaigns(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Campaign>, StoreError>> + Send;

    /// Drops the campaign and all of its tickets.
    fn delete_campaign(&self, id: Uuid) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn tickets(
        &self,
        campaign_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Ticket>, StoreError>> + Send;

    fn reserve(
        &self,
        campaign_id: Uuid,
        tickets: &[Ticket],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn swap_tickets(
        &self,
        campaign_id: Uuid,
        swaps: &[TicketSwap],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns how many tickets were actually removed.
    fn release(
        &self,
        campaign_id: Uuid,
        tickets: &[Ticket],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn save_affiliate(
        &self,
        affiliate: &Affiliate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn affiliates(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Affiliate>, StoreError>> + Send;

    fn delete_affiliate(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
