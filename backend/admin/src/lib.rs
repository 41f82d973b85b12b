//! # Operator CLI
//!
//! One-off maintenance against the production Redis, sharing the server's store.
//!
//! ## Commands
//! - `fee`: quote the publication fee without touching the database
//! - `sweep`: same cleanup the server runs on its interval, once, with progress
//! - `promote` / `demote`: flip `is_admin` at the auth provider and on the stored profile
//! - `stats`: the admin dashboard totals
use anyhow::{Context, bail};
use chrono::Utc;
use raffle::{Cents, fees::{FeeQuote, PaymentMethod}, stats::DashboardStats};
use server::{
    auth::Authenticator,
    database::RedisStore,
    store::Store,
    sweeper::{SweepReport, sweep_campaign},
};
use tracing::info;
use uuid::Uuid;

pub mod utils;

use utils::progress_bar;

pub fn print_quote(total_tickets: u32, ticket_price: Cents, method: PaymentMethod) {
    let quote = FeeQuote::new(total_tickets, ticket_price, method);

    println!("Estimated Revenue: {}", quote.estimated_revenue);
    println!("Publication Fee: {}", quote.publication_fee);
    if method == PaymentMethod::Card {
        println!("Card Fee: {}", quote.card_fee);
    }
    println!("Total: {}", quote.total);
}

async fn connect(redis_url: &str) -> anyhow::Result<RedisStore> {
    RedisStore::connect(redis_url)
        .await
        .with_context(|| format!("Failed to connect to {redis_url}"))
}

pub async fn sweep_all(redis_url: &str) -> anyhow::Result<()> {
    let store = connect(redis_url).await?;
    let campaigns = store.campaigns().await?;
    let now = Utc::now();

    println!("Loaded Campaigns: {}\n", campaigns.len());

    let pb = progress_bar(campaigns.len() as u64)?;
    let mut report = SweepReport::default();

    for campaign in &campaigns {
        pb.set_message(campaign.title.clone());
        report.merge(sweep_campaign(&store, campaign, now).await?);
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    println!("Expired Drafts: {}", report.expired_drafts);
    println!("Released Tickets: {}", report.released_tickets);

    Ok(())
}

pub async fn set_admin(
    redis_url: &str,
    auth: &Authenticator,
    user_id: Uuid,
    is_admin: bool,
) -> anyhow::Result<()> {
    let store = connect(redis_url).await?;

    let Some(mut profile) = store.profile(user_id).await? else {
        bail!("No profile for user {user_id}");
    };

    auth.set_admin(user_id, is_admin)
        .await
        .with_context(|| format!("Failed to update {user_id} at the auth provider"))?;

    if profile.is_admin == is_admin {
        println!("{} already has is_admin={is_admin}", profile.email);
        return Ok(());
    }

    profile.is_admin = is_admin;
    profile.updated_at = Utc::now();
    store.save_profile(&profile).await?;

    info!("Set is_admin={is_admin} on {user_id}");
    println!("{} is_admin={is_admin}", profile.email);

    Ok(())
}

pub async fn print_stats(redis_url: &str) -> anyhow::Result<()> {
    let store = connect(redis_url).await?;

    let users = store.profiles().await?.len();
    let campaigns = store.campaigns().await?;
    let stats = DashboardStats::collect(users, &campaigns);

    println!("Users: {}", stats.total_users);
    println!("Campaigns: {}", stats.total_campaigns);
    println!("Active Campaigns: {}", stats.active_campaigns);
    println!("Revenue: {}", stats.total_revenue);

    Ok(())
}
