use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post, put},
};
use raffle::image::MAX_IMAGE_BYTES;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{state::AppState, store::Store, utils::FILE_NAME_HEADER};

pub mod admin;
pub mod affiliates;
pub mod campaigns;
pub mod images;
pub mod profiles;
pub mod public;

fn cors(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, HeaderName::from_static(FILE_NAME_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!("Invalid ALLOWED_ORIGIN {allowed_origin}: {e}");
            cors
        }
    }
}

pub fn router<S: Store>(state: Arc<AppState<S>>) -> Router {
    let public = Router::new()
        .route("/health", get(public::health))
        .route("/fees", get(public::fees))
        .route("/campaigns/active", get(public::active_campaigns::<S>))
        .route("/c/{id}", get(public::campaign::<S>))
        .route("/c/{id}/quotas", get(public::quotas::<S>))
        .route("/c/{id}/reservations", post(public::reserve::<S>))
        .route("/c/{id}/ranking", get(public::ranking::<S>));

    let account = Router::new()
        .route("/profile", get(profiles::get_profile::<S>).put(profiles::update_profile::<S>))
        .route("/profile/avatar", post(profiles::upload_avatar::<S>))
        .route(
            "/campaigns",
            get(campaigns::list::<S>).post(campaigns::create::<S>),
        )
        .route("/campaigns/form", post(campaigns::create_from_form::<S>))
        .route(
            "/campaigns/{id}",
            get(campaigns::get_campaign::<S>)
                .patch(campaigns::update::<S>)
                .delete(campaigns::remove::<S>),
        )
        .route("/campaigns/{id}/publish", post(campaigns::publish::<S>))
        .route("/campaigns/{id}/draw", post(campaigns::draw::<S>))
        .route("/campaigns/{id}/cancel", post(campaigns::cancel::<S>))
        .route("/campaigns/{id}/tickets", get(campaigns::tickets::<S>))
        .route("/campaigns/{id}/tickets/confirm", post(campaigns::confirm::<S>))
        .route("/campaigns/{id}/images", post(images::upload::<S>))
        .route("/campaigns/{id}/images/order", put(images::reorder::<S>))
        .route("/campaigns/{id}/images/{index}", delete(images::remove::<S>))
        .route(
            "/affiliates",
            get(affiliates::list::<S>).post(affiliates::create::<S>),
        )
        .route("/affiliates/{id}", delete(affiliates::remove::<S>));

    let admin = Router::new()
        .route("/admin/stats", get(admin::stats::<S>))
        .route("/admin/users", get(admin::users::<S>))
        .route("/admin/users/{id}", delete(admin::delete_user::<S>))
        .route("/admin/users/{id}/admin", post(admin::toggle_admin::<S>));

    Router::new()
        .merge(public)
        .merge(account)
        .merge(admin)
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&state.config.allowed_origin))
        .with_state(state)
}
