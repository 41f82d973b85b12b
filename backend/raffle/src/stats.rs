use serde::{Deserialize, Serialize};

use crate::{
    campaign::{Campaign, CampaignStatus},
    money::Cents,
    profile::Profile,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_campaigns: usize,
    pub active_campaigns: usize,
    /// Σ ticket_price × sold_tickets over every campaign.
    pub total_revenue: Cents,
}

impl DashboardStats {
    pub fn collect(total_users: usize, campaigns: &[Campaign]) -> Self {
        Self {
            total_users,
            total_campaigns: campaigns.len(),
            active_campaigns: campaigns
                .iter()
                .filter(|c| c.status == CampaignStatus::Active)
                .count(),
            total_revenue: campaigns
                .iter()
                .fold(Cents::ZERO, |sum, c| sum.saturating_add(c.collected())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserFilter {
    #[default]
    All,
    Admin,
    User,
}

/// Admin panel user list: case-insensitive search on name or email.
pub fn filter_users<'a>(
    profiles: &'a [Profile],
    search: &str,
    filter: UserFilter,
) -> Vec<&'a Profile> {
    let needle = search.trim().to_lowercase();

    profiles
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.email.to_lowercase().contains(&needle)
        })
        .filter(|p| match filter {
            UserFilter::All => true,
            UserFilter::Admin => p.is_admin,
            UserFilter::User => !p.is_admin,
        })
        .collect()
}
