use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use raffle::{
    image::{AVATAR_BUCKET, avatar_key, check_image},
    profile::{Profile, ProfileUpdate},
};

use crate::{
    auth::CurrentUser,
    error::AppError,
    state::AppState,
    store::Store,
    utils::{content_type, file_name, profile_for},
};

pub async fn get_profile<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(profile_for(&state.store, &identity, Utc::now()).await?))
}

pub async fn update_profile<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    let now = Utc::now();
    let mut profile = profile_for(&state.store, &identity, now).await?;

    profile.apply(update, now)?;
    state.store.save_profile(&profile).await?;

    Ok(Json(profile))
}

pub async fn upload_avatar<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Profile>, AppError> {
    let now = Utc::now();
    let mut profile = profile_for(&state.store, &identity, now).await?;

    let kind = check_image(content_type(&headers), body.len())?;
    let key = {
        let mut rng = rand::thread_rng();
        avatar_key(profile.id, file_name(&headers), kind, &mut rng)
    };

    let url = state
        .objects
        .upload(AVATAR_BUCKET, &key, kind.content_type(), body)
        .await?;
    let previous = profile.avatar_url.replace(url);
    profile.updated_at = now;
    state.store.save_profile(&profile).await?;

    if let Some(old) = previous {
        state.objects.discard(AVATAR_BUCKET, &[old]).await;
    }

    Ok(Json(profile))
}
