//! Object storage for prize images and avatars.
//!
//! Objects are public once uploaded, so only the URL is persisted.
use std::collections::HashMap;

use axum::body::Bytes;
use reqwest::Client;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AppError;

pub enum ObjectStore {
    Remote {
        client: Client,
        url: String,
        service_key: String,
    },
    /// Keeps uploads in memory, keyed by `{bucket}/{key}`.
    Memory {
        base_url: String,
        objects: RwLock<HashMap<String, Bytes>>,
    },
}

impl ObjectStore {
    pub fn remote(url: &str, service_key: &str) -> Self {
        ObjectStore::Remote {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    pub fn memory(base_url: &str) -> Self {
        ObjectStore::Memory {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: RwLock::default(),
        }
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        let base = match self {
            ObjectStore::Remote { url, .. } => url,
            ObjectStore::Memory { base_url, .. } => base_url,
        };

        format!("{base}/storage/v1/object/public/{bucket}/{key}")
    }

    /// Object key behind one of our public URLs.
    pub fn key_from_url<'a>(&self, bucket: &str, url: &'a str) -> Option<&'a str> {
        let marker = format!("/storage/v1/object/public/{bucket}/");
        url.split_once(&marker).map(|(_, key)| key)
    }

    /// Uploads without overwriting and returns the public URL.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, AppError> {
        match self {
            ObjectStore::Remote {
                client,
                url,
                service_key,
            } => {
                let res = client
                    .post(format!("{url}/storage/v1/object/{bucket}/{key}"))
                    .bearer_auth(service_key)
                    .header("apikey", service_key)
                    .header("content-type", content_type)
                    .header("cache-control", "max-age=3600")
                    .header("x-upsert", "false")
                    .body(body)
                    .send()
                    .await?;

                if !res.status().is_success() {
                    let status = res.status();
                    warn!("Upload of {bucket}/{key} failed with {status}");
                    return Err(AppError::Upstream(format!("storage returned {status}")));
                }
            }
            ObjectStore::Memory { objects, .. } => {
                objects.write().await.insert(format!("{bucket}/{key}"), body);
            }
        }

        info!("Stored {bucket}/{key}");
        Ok(self.public_url(bucket, key))
    }

    /// Removes the objects behind public URLs. Failures are logged, never returned.
    pub async fn discard(&self, bucket: &str, urls: &[String]) {
        let keys: Vec<&str> = urls
            .iter()
            .filter_map(|url| self.key_from_url(bucket, url))
            .collect();

        if let Err(e) = self.remove(bucket, &keys).await {
            warn!("{} objects left behind in {bucket}: {e}", keys.len());
        }
    }

    pub async fn remove(&self, bucket: &str, keys: &[&str]) -> Result<(), AppError> {
        if keys.is_empty() {
            return Ok(());
        }

        match self {
            ObjectStore::Remote {
                client,
                url,
                service_key,
            } => {
                let res = client
                    .delete(format!("{url}/storage/v1/object/{bucket}"))
                    .bearer_auth(service_key)
                    .header("apikey", service_key)
                    .json(&json!({ "prefixes": keys }))
                    .send()
                    .await?;

                if !res.status().is_success() {
                    let status = res.status();
                    warn!("Removing {} objects from {bucket} failed with {status}", keys.len());
                    return Err(AppError::Upstream(format!("storage returned {status}")));
                }
            }
            ObjectStore::Memory { objects, .. } => {
                let mut objects = objects.write().await;
                for key in keys {
                    objects.remove(&format!("{bucket}/{key}"));
                }
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        match self {
            ObjectStore::Memory { objects, .. } => {
                objects.read().await.contains_key(&format!("{bucket}/{key}"))
            }
            ObjectStore::Remote { .. } => false,
        }
    }
}
