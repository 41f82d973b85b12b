//! Storefront endpoints. No session needed.
use std::{collections::HashSet, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use raffle::{
    Campaign, CampaignError, CampaignStatus, Cents,
    fees::{FeeQuote, PaymentMethod},
    quota::{
        DEFAULT_PAGE, MAX_PAGE, QUANTITY_INCREMENTS, QuantitySelector, QuotaCell, QuotaCounts,
        QuotaFilter, pick_available,
    },
    ranking::{DEFAULT_RANKING_SIZE, RankingEntry, RankingWindow, rank},
    ticket::{Order, Selection, Ticket, board_from, check_order, order_total},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::{AppError, StoreError},
    state::AppState,
    store::Store,
    utils::phone_digits,
};

const DEFAULT_ACTIVE_LIMIT: usize = 10;
const MAX_ACTIVE_LIMIT: usize = 100;

/// Automatic picks race other buyers; retry a couple of times before giving up.
const PICK_ATTEMPTS: usize = 3;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Deserialize)]
pub struct FeeParams {
    total_tickets: u32,
    ticket_price: Cents,
    #[serde(default)]
    payment_method: PaymentMethod,
}

pub async fn fees(Query(params): Query<FeeParams>) -> Json<FeeQuote> {
    Json(FeeQuote::new(
        params.total_tickets,
        params.ticket_price,
        params.payment_method,
    ))
}

#[derive(Deserialize)]
pub struct LimitParams {
    limit: Option<usize>,
}

pub async fn active_campaigns<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<Campaign>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_ACTIVE_LIMIT).min(MAX_ACTIVE_LIMIT);

    let mut active: Vec<Campaign> = state
        .store
        .campaigns()
        .await?
        .into_iter()
        .filter(|c| c.status == CampaignStatus::Active)
        .collect();

    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    active.truncate(limit);

    Ok(Json(active))
}

async fn load<S: Store>(store: &S, id: Uuid) -> Result<Campaign, AppError> {
    store.campaign(id).await?.ok_or(AppError::NotFound("Campaign"))
}

fn owned_by<'a>(
    tickets: &'a [Ticket],
    phone: &'a str,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a Ticket> {
    let digits = phone_digits(phone);

    tickets
        .iter()
        .filter(move |t| !digits.is_empty() && phone_digits(&t.buyer.phone) == digits)
        .filter(move |t| !t.is_expired(now))
}

#[derive(Deserialize)]
pub struct BuyerParams {
    phone: Option<String>,
}

#[derive(Serialize)]
pub struct CampaignView {
    #[serde(flatten)]
    campaign: Campaign,
    counts: QuotaCounts,
    grid_columns: u8,
    /// Drafts are shown to their owner before the fee is paid.
    preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<QuantityView>,
}

/// Starting state of the quantity picker on automatic campaigns.
#[derive(Serialize)]
pub struct QuantityView {
    initial: u32,
    total: Cents,
    steps: &'static [u32],
}

impl From<QuantitySelector> for QuantityView {
    fn from(selector: QuantitySelector) -> Self {
        Self {
            initial: selector.quantity(),
            total: selector.total(),
            steps: &QUANTITY_INCREMENTS,
        }
    }
}

pub async fn campaign<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Query(params): Query<BuyerParams>,
) -> Result<Json<CampaignView>, AppError> {
    let campaign = load(&state.store, id).await?;
    let tickets = state.store.tickets(id).await?;
    let now = Utc::now();

    let board = board_from(campaign.total_tickets, &tickets, now);
    let mut counts = board.counts();
    if let Some(phone) = params.phone.as_deref() {
        counts.mine = owned_by(&tickets, phone, now).count() as u32;
    }

    let quantity = QuantitySelector::for_model(
        campaign.campaign_model,
        campaign.ticket_price,
        campaign.min_tickets_per_purchase,
    )
    .map(QuantityView::from);

    Ok(Json(CampaignView {
        preview: campaign.status == CampaignStatus::Draft,
        quantity,
        grid_columns: board.grid_columns(),
        counts,
        campaign,
    }))
}

#[derive(Deserialize)]
pub struct QuotaParams {
    filter: Option<QuotaFilter>,
    #[serde(default)]
    offset: usize,
    limit: Option<usize>,
    phone: Option<String>,
}

#[derive(Serialize)]
pub struct QuotaPage {
    filter: QuotaFilter,
    offset: usize,
    cells: Vec<QuotaCell>,
}

pub async fn quotas<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Query(params): Query<QuotaParams>,
) -> Result<Json<QuotaPage>, AppError> {
    let campaign = load(&state.store, id).await?;
    let tickets = state.store.tickets(id).await?;
    let now = Utc::now();

    let filter = params
        .filter
        .unwrap_or_else(|| campaign.initial_filter.into());
    let limit = params.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
    let board = board_from(campaign.total_tickets, &tickets, now);

    let cells = match filter {
        QuotaFilter::Mine => {
            let phone = params.phone.as_deref().unwrap_or_default();
            let mut numbers: Vec<u32> = owned_by(&tickets, phone, now).map(|t| t.number).collect();
            numbers.sort_unstable();

            numbers
                .into_iter()
                .skip(params.offset)
                .take(limit)
                .map(|number| QuotaCell {
                    number,
                    status: board.status(number),
                })
                .collect()
        }
        _ => board.page(filter, params.offset, limit),
    };

    Ok(Json(QuotaPage {
        filter,
        offset: params.offset,
        cells,
    }))
}

#[derive(Debug, Serialize)]
pub struct Receipt {
    pub campaign_id: Uuid,
    pub numbers: Vec<u32>,
    pub total: Cents,
    pub expires_at: DateTime<Utc>,
    /// Organizer's contact for sending the payment proof.
    pub phone_number: String,
}

fn choose_numbers(
    campaign: &Campaign,
    tickets: &[Ticket],
    selection: &Selection,
    now: DateTime<Utc>,
) -> Result<Vec<u32>, AppError> {
    let board = board_from(campaign.total_tickets, tickets, now);

    match selection {
        Selection::Manual { numbers } => {
            let taken: Vec<u32> = numbers.iter().copied().filter(|n| board.is_taken(*n)).collect();
            if !taken.is_empty() {
                return Err(CampaignError::Unavailable(taken).into());
            }

            let mut numbers = numbers.clone();
            numbers.sort_unstable();
            Ok(numbers)
        }
        Selection::Automatic { quantity } => {
            let taken: HashSet<u32> = board.purchased.union(&board.reserved).copied().collect();
            let mut rng = rand::thread_rng();

            Ok(pick_available(campaign.total_tickets, &taken, *quantity, &mut rng)?)
        }
    }
}

pub async fn reserve<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    user: Option<CurrentUser>,
    Json(mut order): Json<Order>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = load(&state.store, id).await?;
    let now = Utc::now();

    if campaign.status == CampaignStatus::Active && now > campaign.end_date {
        return Err(CampaignError::NotActive.into());
    }
    check_order(&campaign, &order)?;

    // only a verified session may link tickets to an account
    order.buyer.user_id = user.map(|CurrentUser(identity)| identity.user_id);

    for attempt in 1..=PICK_ATTEMPTS {
        let tickets = state.store.tickets(id).await?;
        let numbers = choose_numbers(&campaign, &tickets, &order.selection, now)?;

        let stale: Vec<Ticket> = tickets
            .into_iter()
            .filter(|t| t.is_expired(now) && numbers.binary_search(&t.number).is_ok())
            .collect();
        if !stale.is_empty() {
            let released = state.store.release(id, &stale).await?;
            debug!("Released {released} expired tickets on {id} before reserving");
        }

        let reserved: Vec<Ticket> = numbers
            .iter()
            .map(|&n| Ticket::reserve(n, order.buyer.clone(), campaign.payment_deadline_hours, now))
            .collect();

        match state.store.reserve(id, &reserved).await {
            Ok(()) => {
                info!("Reserved {} tickets on campaign {id}", numbers.len());

                let receipt = Receipt {
                    campaign_id: id,
                    total: order_total(&campaign, numbers.len() as u32),
                    expires_at: reserved.first().map_or(now, |t| t.expires_at),
                    phone_number: campaign.phone_number.clone(),
                    numbers,
                };
                return Ok((StatusCode::CREATED, Json(receipt)));
            }
            Err(StoreError::Taken(taken)) => {
                if matches!(order.selection, Selection::Manual { .. }) || attempt == PICK_ATTEMPTS {
                    return Err(CampaignError::Unavailable(taken).into());
                }
                debug!("Automatic pick collided on {taken:?}, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::InternalError("reservation retries exhausted".into()))
}

#[derive(Deserialize)]
pub struct RankingParams {
    #[serde(default)]
    window: RankingWindow,
}

pub async fn ranking<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Query(params): Query<RankingParams>,
) -> Result<Json<Vec<RankingEntry>>, AppError> {
    let campaign = load(&state.store, id).await?;

    if !campaign.show_ranking {
        return Err(CampaignError::RankingDisabled.into());
    }

    let tickets = state.store.tickets(id).await?;

    Ok(Json(rank(&tickets, params.window, Utc::now(), DEFAULT_RANKING_SIZE)))
}
