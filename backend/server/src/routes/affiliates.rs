use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use raffle::affiliate::{Affiliate, NewAffiliate};
use tracing::info;
use uuid::Uuid;

use crate::{auth::CurrentUser, error::AppError, state::AppState, store::Store};

pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<Affiliate>>, AppError> {
    let mut affiliates = state.store.affiliates(identity.user_id).await?;
    affiliates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(affiliates))
}

pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Json(input): Json<NewAffiliate>,
) -> Result<impl IntoResponse, AppError> {
    let affiliate = Affiliate::create(input, identity.user_id, Utc::now())?;
    state.store.save_affiliate(&affiliate).await?;

    info!("Affiliate {} added by {}", affiliate.id, identity.user_id);
    Ok((StatusCode::CREATED, Json(affiliate)))
}

pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.store.delete_affiliate(identity.user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Affiliate"))
    }
}
