use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;
use raffle::{
    Campaign, ImageError,
    image::{self, MAX_PRIZE_IMAGES, PRIZE_BUCKET, check_image, prize_key},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::AppError,
    state::AppState,
    store::Store,
    utils::{content_type, ensure_editable, file_name, owned_campaign, update_campaign},
};

fn check_room(campaign: &Campaign) -> Result<(), AppError> {
    ensure_editable(campaign, "edit")?;

    if campaign.prize_image_urls.len() >= MAX_PRIZE_IMAGES {
        return Err(ImageError::Limit(MAX_PRIZE_IMAGES).into());
    }

    Ok(())
}

/// Raw image body. `Content-Type` picks the format, `X-File-Name` the extension.
pub async fn upload<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Campaign>, AppError> {
    let campaign = owned_campaign(&state.store, id, &identity).await?;
    check_room(&campaign)?;

    let kind = check_image(content_type(&headers), body.len())?;
    let now = Utc::now();
    let key = {
        let mut rng = rand::thread_rng();
        prize_key(campaign.user_id, file_name(&headers), kind, now, &mut rng)
    };

    let url = state
        .objects
        .upload(PRIZE_BUCKET, &key, kind.content_type(), body)
        .await?;

    let saved = update_campaign(&state.store, id, &identity, |campaign| {
        check_room(campaign)?;
        campaign.prize_image_urls.push(url.clone());
        campaign.updated_at = now;
        Ok(())
    })
    .await;

    match saved {
        Ok((campaign, ())) => Ok(Json(campaign)),
        Err(e) => {
            state.objects.discard(PRIZE_BUCKET, &[url]).await;
            Err(e)
        }
    }
}

#[derive(Deserialize)]
pub struct Move {
    from: usize,
    to: usize,
}

pub async fn reorder<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<Move>,
) -> Result<Json<Campaign>, AppError> {
    let now = Utc::now();
    let (campaign, ()) = update_campaign(&state.store, id, &identity, |campaign| {
        ensure_editable(campaign, "edit")?;
        image::reorder(&mut campaign.prize_image_urls, request.from, request.to)?;
        campaign.updated_at = now;
        Ok(())
    })
    .await?;

    Ok(Json(campaign))
}

pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(identity): CurrentUser,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<Campaign>, AppError> {
    let now = Utc::now();
    let (campaign, url) = update_campaign(&state.store, id, &identity, |campaign| {
        ensure_editable(campaign, "edit")?;
        let url = image::remove(&mut campaign.prize_image_urls, index)?;
        campaign.updated_at = now;
        Ok(url)
    })
    .await?;

    state.objects.discard(PRIZE_BUCKET, &[url]).await;

    Ok(Json(campaign))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{
            Method, Request, StatusCode,
            header::{AUTHORIZATION, CONTENT_TYPE},
        },
    };
    use serde_json::json;

    use crate::{
        routes::tests::{OWNER, TestApp, campaign_body},
        utils::FILE_NAME_HEADER,
    };

    async fn upload(
        app: &TestApp,
        id: &str,
        content_type: &str,
        bytes: &'static [u8],
    ) -> StatusCode {
        let request = Request::post(format!("/campaigns/{id}/images"))
            .header(AUTHORIZATION, format!("Bearer {OWNER}"))
            .header(CONTENT_TYPE, content_type)
            .header(FILE_NAME_HEADER, "premio.png")
            .body(Body::from(bytes))
            .unwrap();

        app.send(request).await.status()
    }

    #[tokio::test]
    async fn test_upload_reorder_remove() {
        let app = TestApp::new();
        let (_, created) = app
            .json(Method::POST, "/campaigns", Some(OWNER), Some(campaign_body()))
            .await;
        let id = created["id"].as_str().unwrap();

        assert_eq!(upload(&app, id, "image/png", b"first").await, StatusCode::OK);
        assert_eq!(upload(&app, id, "image/png", b"second").await, StatusCode::OK);
        assert_eq!(upload(&app, id, "image/gif", b"gif").await, StatusCode::BAD_REQUEST);

        let (_, campaign) = app
            .json(Method::GET, &format!("/campaigns/{id}"), Some(OWNER), None)
            .await;
        let urls = campaign["prize_image_urls"].as_array().unwrap().clone();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].as_str().unwrap().ends_with(".png"));

        let (status, moved) = app
            .json(
                Method::PUT,
                &format!("/campaigns/{id}/images/order"),
                Some(OWNER),
                Some(json!({ "from": 1, "to": 0 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["prize_image_urls"][0], urls[1]);

        let (status, trimmed) = app
            .json(Method::DELETE, &format!("/campaigns/{id}/images/0"), Some(OWNER), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trimmed["prize_image_urls"], json!([urls[0]]));

        let (status, _) = app
            .json(Method::DELETE, &format!("/campaigns/{id}/images/5"), Some(OWNER), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
