//! Organizer dashboard: campaign CRUD and lifecycle.
//!
//! Every change to a stored campaign goes through [`update_campaign`], so two
//! dashboard tabs cannot overwrite each other's edits.
use std::{collections::BTreeSet, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use raffle::{
    Campaign, CampaignError, CampaignPatch, CampaignStatus, NewCampaign,
    fees::{FeeQuote, PaymentMethod},
    image::PRIZE_BUCKET,
    ticket::{Ticket, TicketStatus},
    validation::CampaignForm,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::AppError,
    state::AppState,
    store::Store,
    utils::{owned_campaign, sold_count, update_campaign},
};

#[derive(Deserialize)]
pub struct ListParams {
    status: Option<CampaignStatus>,
}

pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Campaign>>, AppError> {
    let mut campaigns: Vec<Campaign> = state
        .store
        .user_campaigns(identity.user_id)
        .await?
        .into_iter()
        .filter(|c| params.status.is_none_or(|s| c.status == s))
        .collect();

    campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(campaigns))
}

async fn insert<S: Store>(
    state: &AppState<S>,
    input: NewCampaign,
    user_id: Uuid,
) -> Result<(StatusCode, Json<Campaign>), AppError> {
    let campaign = Campaign::create(input, user_id, Utc::now())?;
    state.store.save_campaign(&campaign).await?;

    info!("Campaign {} drafted by {user_id}", campaign.id);
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Json(input): Json<NewCampaign>,
) -> Result<(StatusCode, Json<Campaign>), AppError> {
    insert(&state, input, identity.user_id).await
}

pub async fn create_from_form<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Json(form): Json<CampaignForm>,
) -> Result<(StatusCode, Json<Campaign>), AppError> {
    let input = form.into_new_campaign()?;
    insert(&state, input, identity.user_id).await
}

pub async fn get_campaign<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, AppError> {
    Ok(Json(owned_campaign(&state.store, id, &identity).await?))
}

pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<CampaignPatch>,
) -> Result<Json<Campaign>, AppError> {
    let now = Utc::now();
    let (updated, ()) = update_campaign(&state.store, id, &identity, |campaign| {
        *campaign = campaign.apply(patch.clone(), now)?;
        Ok(())
    })
    .await?;

    Ok(Json(updated))
}

pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let campaign = owned_campaign(&state.store, id, &identity).await?;

    if campaign.status == CampaignStatus::Active {
        return Err(CampaignError::InvalidTransition {
            from: campaign.status,
            action: "delete",
        }
        .into());
    }

    state.store.delete_campaign(id).await?;
    state
        .objects
        .discard(PRIZE_BUCKET, &campaign.prize_image_urls)
        .await;
    info!("Campaign {id} deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    payment_method: PaymentMethod,
}

#[derive(Serialize)]
pub struct Published {
    campaign: Campaign,
    quote: FeeQuote,
}

/// Called once the publication fee is paid.
pub async fn publish<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<Published>, AppError> {
    let now = Utc::now();
    let (campaign, quote) = update_campaign(&state.store, id, &identity, |campaign| {
        Ok(campaign.publish(request.payment_method, now)?)
    })
    .await?;

    info!("Campaign {id} published, fee {}", quote.total);

    Ok(Json(Published { campaign, quote }))
}

#[derive(Deserialize)]
pub struct DrawRequest {
    winner_ticket_number: u32,
}

pub async fn draw<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<DrawRequest>,
) -> Result<Json<Campaign>, AppError> {
    owned_campaign(&state.store, id, &identity).await?;
    let number = request.winner_ticket_number;

    let winner = state
        .store
        .tickets(id)
        .await?
        .into_iter()
        .find(|t| t.number == number && t.status == TicketStatus::Purchased)
        .ok_or(CampaignError::UnknownWinner(number))?;

    let now = Utc::now();
    let (campaign, ()) = update_campaign(&state.store, id, &identity, |campaign| {
        Ok(campaign.complete(number, winner.buyer.user_id, now)?)
    })
    .await?;

    info!("Campaign {id} drawn, winning ticket {number}");
    Ok(Json(campaign))
}

pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, AppError> {
    let now = Utc::now();
    let (campaign, ()) = update_campaign(&state.store, id, &identity, |campaign| {
        Ok(campaign.cancel(now)?)
    })
    .await?;

    info!("Campaign {id} cancelled");
    Ok(Json(campaign))
}

pub async fn tickets<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    owned_campaign(&state.store, id, &identity).await?;

    let mut tickets = state.store.tickets(id).await?;
    tickets.sort_by_key(|t| t.number);

    Ok(Json(tickets))
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    numbers: Vec<u32>,
}

/// Marks reservations as paid after the organizer checks the payment.
///
/// Only live reservations qualify. Each ticket is written back only if it is
/// still the exact reservation read here, so a number that lapsed and went to
/// another buyer in the meantime fails with 409 instead of changing hands.
pub async fn confirm<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<Campaign>, AppError> {
    let campaign = owned_campaign(&state.store, id, &identity).await?;
    if campaign.status != CampaignStatus::Active {
        return Err(CampaignError::NotActive.into());
    }

    let now = Utc::now();
    let tickets = state.store.tickets(id).await?;
    let requested: BTreeSet<u32> = request.numbers.into_iter().collect();

    let mut missing = Vec::new();
    let mut expired = Vec::new();
    let mut swaps = Vec::with_capacity(requested.len());
    for number in requested {
        let reserved = tickets
            .iter()
            .find(|t| t.number == number && t.status == TicketStatus::Reserved);

        match reserved {
            None => missing.push(number),
            Some(ticket) if ticket.is_expired(now) => expired.push(number),
            Some(ticket) => {
                let mut paid = ticket.clone();
                paid.confirm(now);
                swaps.push((ticket.clone(), paid));
            }
        }
    }
    if !missing.is_empty() {
        return Err(CampaignError::Unavailable(missing).into());
    }
    if !expired.is_empty() {
        return Err(CampaignError::Expired(expired).into());
    }

    state.store.swap_tickets(id, &swaps).await?;

    let sold = sold_count(&state.store.tickets(id).await?);
    let (campaign, ()) = update_campaign(&state.store, id, &identity, |campaign| {
        // purchases are never undone, the larger count is the newer one
        campaign.sold_tickets = campaign.sold_tickets.max(sold);
        campaign.updated_at = now;
        Ok(())
    })
    .await?;

    info!("Confirmed {} tickets on {id}", swaps.len());
    Ok(Json(campaign))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};
    use raffle::ticket::{Buyer, Ticket};
    use serde_json::json;
    use uuid::Uuid;

    use crate::{
        routes::tests::{OWNER, STRANGER, TestApp, active_campaign, campaign_body},
        store::Store,
    };

    #[tokio::test]
    async fn test_create_reports_every_field() {
        let app = TestApp::new();

        let (status, body) = app
            .json(
                Method::POST,
                "/campaigns",
                Some(OWNER),
                Some(json!({
                    "title": "ab",
                    "ticket_price": 0,
                    "total_tickets": 10,
                    "draw_method": "Outros",
                    "phone_number": "123"
                })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"ticket_price"));
        assert!(fields.contains(&"phone_number"));
    }

    #[tokio::test]
    async fn test_create_from_form() {
        let app = TestApp::new();
        let form = json!({
            "title": "Moto 0km",
            "ticketQuantity": 1000,
            "ticketPrice": "1,50",
            "drawMethod": "Live no Instagram",
            "phoneNumber": "(11) 98888-7777",
            "paymentDeadlineHours": 48,
            "requireEmail": true,
            "showRanking": true,
            "minTicketsPerPurchase": 1,
            "maxTicketsPerPurchase": 100,
            "initialFilter": "available",
            "campaignModel": "automatic"
        });

        let (status, campaign) = app
            .json(Method::POST, "/campaigns/form", Some(OWNER), Some(form))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{campaign}");
        assert_eq!(campaign["ticket_price"], 150);
        assert_eq!(campaign["status"], "draft");

        let (status, body) = app
            .json(
                Method::POST,
                "/campaigns/form",
                Some(OWNER),
                Some(json!({
                    "title": "Moto 0km",
                    "ticketQuantity": 1000,
                    "ticketPrice": "1.50",
                    "drawMethod": "",
                    "phoneNumber": "(11) 98888-7777",
                    "paymentDeadlineHours": 48,
                    "requireEmail": true,
                    "showRanking": true,
                    "minTicketsPerPurchase": 1,
                    "maxTicketsPerPurchase": 100,
                    "initialFilter": "all",
                    "campaignModel": "manual"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"][0]["field"], "ticketPrice");
        assert_eq!(body["fields"][1]["field"], "drawMethod");
    }

    #[tokio::test]
    async fn test_other_owners_campaigns_are_hidden() {
        let app = TestApp::new();
        let id = active_campaign(&app, campaign_body()).await;

        let (status, _) = app
            .json(Method::GET, &format!("/campaigns/{id}"), Some(STRANGER), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .json(Method::POST, &format!("/campaigns/{id}/cancel"), Some(STRANGER), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_active_campaign_locks_price_and_refuses_delete() {
        let app = TestApp::new();
        let id = active_campaign(&app, campaign_body()).await;
        let uri = format!("/campaigns/{id}");

        let (status, _) = app
            .json(Method::PATCH, &uri, Some(OWNER), Some(json!({ "ticket_price": 999 })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, updated) = app
            .json(Method::PATCH, &uri, Some(OWNER), Some(json!({ "title": "Rifa do iPhone 16" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Rifa do iPhone 16");

        let (status, _) = app.json(Method::DELETE, &uri, Some(OWNER), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .json(Method::POST, &format!("{uri}/cancel"), Some(OWNER), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.json(Method::DELETE, &uri, Some(OWNER), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_confirm_then_draw() {
        let app = TestApp::new();
        let id = active_campaign(&app, campaign_body()).await;

        let (status, _) = app
            .json(
                Method::POST,
                &format!("/c/{id}/reservations"),
                Some(STRANGER),
                Some(json!({
                    "buyer": { "name": "Carla", "phone": "31977776666" },
                    "selection": { "mode": "manual", "numbers": [4, 9] }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        // unpaid tickets cannot win
        let (status, _) = app
            .json(
                Method::POST,
                &format!("/campaigns/{id}/draw"),
                Some(OWNER),
                Some(json!({ "winner_ticket_number": 4 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .json(
                Method::POST,
                &format!("/campaigns/{id}/tickets/confirm"),
                Some(OWNER),
                Some(json!({ "numbers": [4, 5] })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["numbers"], json!([5]));

        let (status, campaign) = app
            .json(
                Method::POST,
                &format!("/campaigns/{id}/tickets/confirm"),
                Some(OWNER),
                Some(json!({ "numbers": [4, 9] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(campaign["sold_tickets"], 2);

        let (status, campaign) = app
            .json(
                Method::POST,
                &format!("/campaigns/{id}/draw"),
                Some(OWNER),
                Some(json!({ "winner_ticket_number": 4 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(campaign["status"], "completed");
        assert_eq!(campaign["winner_ticket_number"], 4);
        assert!(campaign["winner_user_id"].is_string());
    }

    #[tokio::test]
    async fn test_confirm_refuses_lapsed_reservation() {
        let app = TestApp::new();
        let id = active_campaign(&app, campaign_body()).await;
        let campaign_id: Uuid = id.parse().unwrap();

        let buyer = Buyer {
            name: "Davi".to_string(),
            email: None,
            phone: "41955554444".to_string(),
            user_id: None,
        };
        // 24h deadline, reserved two days ago, not swept yet
        let lapsed = Ticket::reserve(3, buyer, 24, Utc::now() - Duration::days(2));
        app.state.store.reserve(campaign_id, &[lapsed.clone()]).await.unwrap();

        let (status, body) = app
            .json(
                Method::POST,
                &format!("/campaigns/{id}/tickets/confirm"),
                Some(OWNER),
                Some(json!({ "numbers": [3] })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["numbers"], json!([3]));

        assert_eq!(app.state.store.tickets(campaign_id).await.unwrap(), vec![lapsed]);
        let (_, campaign) = app
            .json(Method::GET, &format!("/campaigns/{id}"), Some(OWNER), None)
            .await;
        assert_eq!(campaign["sold_tickets"], 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let app = TestApp::new();
        active_campaign(&app, campaign_body()).await;
        app.json(Method::POST, "/campaigns", Some(OWNER), Some(campaign_body()))
            .await;

        let (_, all) = app.json(Method::GET, "/campaigns", Some(OWNER), None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, drafts) = app
            .json(Method::GET, "/campaigns?status=draft", Some(OWNER), None)
            .await;
        assert_eq!(drafts.as_array().unwrap().len(), 1);

        let (_, none) = app.json(Method::GET, "/campaigns", Some(STRANGER), None).await;
        assert!(none.as_array().unwrap().is_empty());
    }
}
