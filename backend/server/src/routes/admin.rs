//! Admin panel. Every handler requires [`AdminUser`].
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use raffle::{
    image::{AVATAR_BUCKET, PRIZE_BUCKET},
    profile::Profile,
    stats::{DashboardStats, UserFilter, filter_users},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{auth::AdminUser, error::AppError, state::AppState, store::Store};

pub async fn stats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_): AdminUser,
) -> Result<Json<DashboardStats>, AppError> {
    let users = state.store.profiles().await?.len();
    let campaigns = state.store.campaigns().await?;

    Ok(Json(DashboardStats::collect(users, &campaigns)))
}

#[derive(Deserialize)]
pub struct UserParams {
    #[serde(default)]
    search: String,
    #[serde(default)]
    filter: UserFilter,
}

pub async fn users<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_): AdminUser,
    Query(params): Query<UserParams>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = state.store.profiles().await?;

    let mut matched: Vec<Profile> = filter_users(&profiles, &params.search, params.filter)
        .into_iter()
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(matched))
}

pub async fn toggle_admin<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    if id == admin.user_id {
        return Err(AppError::Forbidden("cannot change your own admin status"));
    }

    let mut profile = state.store.profile(id).await?.ok_or(AppError::NotFound("User"))?;
    profile.is_admin = !profile.is_admin;
    profile.updated_at = Utc::now();

    state.auth.set_admin(id, profile.is_admin).await?;
    state.store.save_profile(&profile).await?;

    info!("{} set admin={} on {id}", admin.user_id, profile.is_admin);
    Ok(Json(profile))
}

/// Removes the account at the provider along with everything it owns here.
pub async fn delete_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if id == admin.user_id {
        return Err(AppError::Forbidden("cannot delete yourself"));
    }
    let profile = state.store.profile(id).await?.ok_or(AppError::NotFound("User"))?;

    state.auth.delete_user(id).await?;

    for campaign in state.store.user_campaigns(id).await? {
        state.store.delete_campaign(campaign.id).await?;
        state
            .objects
            .discard(PRIZE_BUCKET, &campaign.prize_image_urls)
            .await;
    }
    for affiliate in state.store.affiliates(id).await? {
        state.store.delete_affiliate(id, affiliate.id).await?;
    }
    state.store.delete_profile(id).await?;
    if let Some(avatar) = profile.avatar_url {
        state.objects.discard(AVATAR_BUCKET, &[avatar]).await;
    }

    info!("{} deleted user {id}", admin.user_id);
    Ok(StatusCode::NO_CONTENT)
}
