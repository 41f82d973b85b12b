//! # Redis
//!
//! Primary database. Records are JSON strings inside hashes, with sets as
//! secondary indexes.
//!
//! ## Layout
//!
//! | key | type | contents |
//! |-----|------|----------|
//! | `profiles` | hash | user id → profile |
//! | `campaigns` | hash | campaign id → campaign |
//! | `user:{id}:campaigns` | set | campaign ids owned by the user |
//! | `tickets:{campaign}` | hash | ticket number → ticket |
//! | `affiliates` | hash | affiliate id → affiliate |
//! | `user:{id}:affiliates` | set | affiliate ids registered by the user |
//!
//! ## Tickets
//!
//! - A number is taken while its field exists in `tickets:{campaign}`
//! - Reserving several numbers runs as one Lua script, so two buyers can never
//!   split a batch
//! - Releasing compares the stored JSON first, so a ticket confirmed after the
//!   sweeper read it is left alone
//! - Confirming swaps whole records only if every one still matches what the
//!   organizer saw, so a number re-reserved by someone else is never sold to the old buyer
//! - Campaign edits go through the same compare-then-write check on `campaigns`
//!
//! ## Sizing
//! - Worst case is a 10 million ticket campaign selling out: roughly 250 bytes
//!   per ticket record, about 2.5 GB. Realistic campaigns stay well below 100k tickets.
use std::{sync::LazyLock, time::Duration};

use raffle::{Campaign, affiliate::Affiliate, profile::Profile, ticket::Ticket};
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::StoreError,
    store::{Store, TicketSwap},
};

const PROFILES: &str = "profiles";
const CAMPAIGNS: &str = "campaigns";
const AFFILIATES: &str = "affiliates";

fn user_campaigns_key(user_id: Uuid) -> String {
    format!("user:{user_id}:campaigns")
}

fn user_affiliates_key(user_id: Uuid) -> String {
    format!("user:{user_id}:affiliates")
}

fn tickets_key(campaign_id: Uuid) -> String {
    format!("tickets:{campaign_id}")
}

// ARGV: number, record, number, record, ...
static RESERVE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local taken = {}
        for i = 1, #ARGV, 2 do
            if redis.call('HEXISTS', KEYS[1], ARGV[i]) == 1 then
                table.insert(taken, ARGV[i])
            end
        end
        if #taken > 0 then
            return taken
        end
        for i = 1, #ARGV, 2 do
            redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
        end
        return taken
        ",
    )
});

// ARGV: number, expected record, ...
static RELEASE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local released = 0
        for i = 1, #ARGV, 2 do
            if redis.call('HGET', KEYS[1], ARGV[i]) == ARGV[i + 1] then
                released = released + redis.call('HDEL', KEYS[1], ARGV[i])
            end
        end
        return released
        ",
    )
});

// ARGV: number, expected record, new record, ...
static SWAP: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local changed = {}
        for i = 1, #ARGV, 3 do
            if redis.call('HGET', KEYS[1], ARGV[i]) ~= ARGV[i + 1] then
                table.insert(changed, ARGV[i])
            end
        end
        if #changed > 0 then
            return changed
        end
        for i = 1, #ARGV, 3 do
            redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 2])
        end
        return changed
        ",
    )
});

// ARGV: id, expected record, new record
static REPLACE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
            redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
            return 1
        end
        return 0
        ",
    )
});

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            connection: init_redis(redis_url).await?,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        field: String,
    ) -> Result<Option<T>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.hget(key, field).await?;

        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn get_many<T: DeserializeOwned>(
        &self,
        key: &str,
        fields: Vec<String>,
    ) -> Result<Vec<T>, StoreError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        let raw: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(key)
            .arg(&fields)
            .query_async(&mut conn)
            .await?;

        raw.into_iter()
            .flatten()
            .map(|s| serde_json::from_str(&s).map_err(StoreError::from))
            .collect()
    }

    async fn values<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn.hvals(key).await?;

        raw.iter()
            .map(|s| serde_json::from_str(s).map_err(StoreError::from))
            .collect()
    }

    async fn put<T: Serialize>(
        &self,
        key: &str,
        field: String,
        value: &T,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection.clone();
        let _: () = conn.hset(key, field, json).await?;

        Ok(())
    }

    fn ticket_args(tickets: &[Ticket]) -> Result<Vec<String>, StoreError> {
        let mut args = Vec::with_capacity(tickets.len() * 2);
        for ticket in tickets {
            args.push(ticket.number.to_string());
            args.push(serde_json::to_string(ticket)?);
        }

        Ok(args)
    }
}

impl Store for RedisStore {
    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.put(PROFILES, profile.id.to_string(), profile).await
    }

    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        self.get(PROFILES, id.to_string()).await
    }

    async fn profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.values(PROFILES).await
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let removed: u32 = conn.hdel(PROFILES, id.to_string()).await?;

        Ok(removed > 0)
    }

    async fn save_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let json = serde_json::to_string(campaign)?;
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .hset(CAMPAIGNS, campaign.id.to_string(), json)
            .ignore()
            .sadd(user_campaigns_key(campaign.user_id), campaign.id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn replace_campaign(
        &self,
        expected: &Campaign,
        updated: &Campaign,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();

        let replaced: bool = REPLACE
            .key(CAMPAIGNS)
            .arg(expected.id.to_string())
            .arg(serde_json::to_string(expected)?)
            .arg(serde_json::to_string(updated)?)
            .invoke_async(&mut conn)
            .await?;

        Ok(replaced)
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        self.get(CAMPAIGNS, id.to_string()).await
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        self.values(CAMPAIGNS).await
    }

    async fn user_campaigns(&self, user_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let mut conn = self.connection.clone();
        let ids: Vec<String> = conn.smembers(user_campaigns_key(user_id)).await?;

        self.get_many(CAMPAIGNS, ids).await
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some(campaign) = self.campaign(id).await? else {
            return Ok(false);
        };

        let mut conn = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .hdel(CAMPAIGNS, id.to_string())
            .ignore()
            .srem(user_campaigns_key(campaign.user_id), id.to_string())
            .ignore()
            .del(tickets_key(id))
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(true)
    }

    async fn tickets(&self, campaign_id: Uuid) -> Result<Vec<Ticket>, StoreError> {
        self.values(&tickets_key(campaign_id)).await
    }

    async fn reserve(&self, campaign_id: Uuid, tickets: &[Ticket]) -> Result<(), StoreError> {
        if tickets.is_empty() {
            return Ok(());
        }

        let args = Self::ticket_args(tickets)?;
        let mut conn = self.connection.clone();

        let taken: Vec<u32> = RESERVE
            .key(tickets_key(campaign_id))
            .arg(args)
            .invoke_async(&mut conn)
            .await?;

        if taken.is_empty() {
            debug!("Reserved {} tickets on {campaign_id}", tickets.len());
            Ok(())
        } else {
            Err(StoreError::Taken(taken))
        }
    }

    async fn swap_tickets(
        &self,
        campaign_id: Uuid,
        swaps: &[TicketSwap],
    ) -> Result<(), StoreError> {
        if swaps.is_empty() {
            return Ok(());
        }

        let mut args = Vec::with_capacity(swaps.len() * 3);
        for (expected, updated) in swaps {
            args.push(expected.number.to_string());
            args.push(serde_json::to_string(expected)?);
            args.push(serde_json::to_string(updated)?);
        }

        let mut conn = self.connection.clone();
        let changed: Vec<u32> = SWAP
            .key(tickets_key(campaign_id))
            .arg(args)
            .invoke_async(&mut conn)
            .await?;

        if changed.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Changed(changed))
        }
    }

    async fn release(&self, campaign_id: Uuid, tickets: &[Ticket]) -> Result<usize, StoreError> {
        if tickets.is_empty() {
            return Ok(0);
        }

        let args = Self::ticket_args(tickets)?;
        let mut conn = self.connection.clone();

        let released: usize = RELEASE
            .key(tickets_key(campaign_id))
            .arg(args)
            .invoke_async(&mut conn)
            .await?;

        Ok(released)
    }

    async fn save_affiliate(&self, affiliate: &Affiliate) -> Result<(), StoreError> {
        let json = serde_json::to_string(affiliate)?;
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .hset(AFFILIATES, affiliate.id.to_string(), json)
            .ignore()
            .sadd(user_affiliates_key(affiliate.owner_id), affiliate.id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn affiliates(&self, owner_id: Uuid) -> Result<Vec<Affiliate>, StoreError> {
        let mut conn = self.connection.clone();
        let ids: Vec<String> = conn.smembers(user_affiliates_key(owner_id)).await?;

        self.get_many(AFFILIATES, ids).await
    }

    async fn delete_affiliate(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let owned: bool = conn
            .sismember(user_affiliates_key(owner_id), id.to_string())
            .await?;

        if !owned {
            return Ok(false);
        }

        let _: () = redis::pipe()
            .atomic()
            .hdel(AFFILIATES, id.to_string())
            .ignore()
            .srem(user_affiliates_key(owner_id), id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(true)
    }
}
