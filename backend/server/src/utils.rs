use axum::http::{HeaderMap, header::CONTENT_TYPE};
use chrono::{DateTime, Utc};
use raffle::{
    Campaign, CampaignStatus,
    profile::Profile,
    ticket::{Ticket, TicketStatus},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::Identity,
    error::{AppError, StoreError},
    store::Store,
};

pub const FILE_NAME_HEADER: &str = "x-file-name";

const WRITE_ATTEMPTS: usize = 5;

/// Campaign the caller may manage: their own, or any for admins.
pub async fn owned_campaign<S: Store>(
    store: &S,
    id: Uuid,
    identity: &Identity,
) -> Result<Campaign, AppError> {
    let campaign = store.campaign(id).await?.ok_or(AppError::NotFound("Campaign"))?;

    if campaign.user_id != identity.user_id && !identity.is_admin {
        return Err(AppError::NotFound("Campaign"));
    }

    Ok(campaign)
}

/// Read-modify-write on a campaign the caller may manage. `change` runs again on
/// a fresh copy whenever another writer saved in between.
pub async fn update_campaign<S, T, F>(
    store: &S,
    id: Uuid,
    identity: &Identity,
    mut change: F,
) -> Result<(Campaign, T), AppError>
where
    S: Store,
    T: Send,
    F: FnMut(&mut Campaign) -> Result<T, AppError> + Send,
{
    for _ in 0..WRITE_ATTEMPTS {
        let current = owned_campaign(store, id, identity).await?;
        let mut updated = current.clone();
        let output = change(&mut updated)?;

        if store.replace_campaign(&current, &updated).await? {
            return Ok((updated, output));
        }
        debug!("Campaign {id} changed while updating, retrying");
    }

    Err(StoreError::Contended.into())
}

/// Stored profile, created from the provider identity on first sight.
pub async fn profile_for<S: Store>(
    store: &S,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<Profile, AppError> {
    if let Some(mut profile) = store.profile(identity.user_id).await? {
        // admins granted at the provider show up in the user list too
        if identity.is_admin && !profile.is_admin {
            profile.is_admin = true;
            profile.updated_at = now;
            store.save_profile(&profile).await?;
        }
        return Ok(profile);
    }

    let fallback = identity.email.split('@').next().unwrap_or_default();
    let name = identity.name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or(fallback);

    let mut profile = Profile::new(identity.user_id, name, &identity.email, now)?;
    profile.is_admin = identity.is_admin;
    store.save_profile(&profile).await?;

    Ok(profile)
}

/// Campaigns past `draft`/`active` are frozen.
pub fn ensure_editable(campaign: &Campaign, action: &'static str) -> Result<(), AppError> {
    match campaign.status {
        CampaignStatus::Draft | CampaignStatus::Active => Ok(()),
        from => Err(raffle::CampaignError::InvalidTransition { from, action }.into()),
    }
}

pub fn sold_count(tickets: &[Ticket]) -> u32 {
    tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Purchased)
        .count() as u32
}

pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

pub fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub fn file_name(headers: &HeaderMap) -> Option<&str> {
    headers.get(FILE_NAME_HEADER).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_header_helpers() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_type(&headers), "");
        assert_eq!(file_name(&headers), None);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        headers.insert(FILE_NAME_HEADER, HeaderValue::from_static("premio.png"));

        assert_eq!(content_type(&headers), "image/png");
        assert_eq!(file_name(&headers), Some("premio.png"));
    }

    #[test]
    fn test_phone_digits() {
        assert_eq!(phone_digits("(11) 99999-8888"), "11999998888");
    }

    fn identity(is_admin: bool) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "dono@example.com".to_string(),
            name: None,
            is_admin,
        }
    }

    async fn stored_campaign(store: &MemoryStore, owner: &Identity) -> Campaign {
        let input = serde_json::from_value(serde_json::json!({
            "title": "Rifa do Sofá",
            "ticket_price": 300,
            "total_tickets": 20,
            "draw_method": "Loteria Federal",
            "phone_number": "(11) 99999-8888"
        }))
        .unwrap();
        let campaign = Campaign::create(input, owner.user_id, Utc::now()).unwrap();

        store.save_campaign(&campaign).await.unwrap();
        campaign
    }

    #[tokio::test]
    async fn test_update_campaign_saves_change() {
        let store = MemoryStore::new();
        let owner = identity(false);
        let campaign = stored_campaign(&store, &owner).await;

        let (updated, previous) = update_campaign(&store, campaign.id, &owner, |c| {
            Ok(std::mem::replace(&mut c.title, "Rifa da Mesa".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(previous, "Rifa do Sofá");
        assert_eq!(updated.title, "Rifa da Mesa");
        assert_eq!(store.campaign(campaign.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_campaign_failure_writes_nothing() {
        let store = MemoryStore::new();
        let owner = identity(false);
        let campaign = stored_campaign(&store, &owner).await;

        let result = update_campaign(&store, campaign.id, &owner, |c| {
            c.title = "Nunca salvo".to_string();
            Err::<(), _>(AppError::Forbidden("no"))
        })
        .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(store.campaign(campaign.id).await.unwrap(), Some(campaign.clone()));

        let stranger = identity(false);
        let result = update_campaign(&store, campaign.id, &stranger, |_| Ok(())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let admin = identity(true);
        assert!(update_campaign(&store, campaign.id, &admin, |_| Ok(())).await.is_ok());
    }

    #[tokio::test]
    async fn test_provider_admin_flag_reaches_profile() {
        let store = MemoryStore::new();
        let admin = identity(true);

        let profile = profile_for(&store, &admin, Utc::now()).await.unwrap();
        assert!(profile.is_admin);
        assert_eq!(profile.name, "dono");
    }
}
