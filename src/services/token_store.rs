use crate::services::blob_store::BlobStore;
use crate::services::error::ExchangeError;
use crate::utils::validation::split_name;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;

/// One issued token and the file it grants access to.
///
/// `original_name` is the caller-supplied display name and is never used to
/// build paths; on disk the blob is named after the token.
#[derive(Debug, Clone, Serialize)]
pub struct FileToken {
    pub token: String,
    pub stored_name: String,
    pub original_name: String,
    #[serde(skip)]
    pub storage_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FileToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Generate a URL-safe random token
fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..24).map(|_| rng.r#gen()).collect();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes)
}

/// In-memory token → entry index with fixed-TTL expiry.
///
/// The map is sharded, so insert/remove are atomic per token and unrelated
/// tokens never contend. Expiry is enforced lazily on every read in
/// addition to the background sweep: no caller can observe a logically
/// expired entry even if the reaper has not run yet. Blob deletion always
/// happens after the index entry is removed, never under a shard lock, and
/// is idempotent, so a lookup racing the reaper over the same expired
/// token resolves to exactly one effective deletion.
pub struct TokenStore {
    tokens: DashMap<String, FileToken>,
    blobs: BlobStore,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(blobs: BlobStore, ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            blobs,
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Stores `data` and mints a fresh token for it. The stored filename is
    /// the token plus the display name's extension, preserved verbatim.
    pub async fn issue(
        &self,
        data: &[u8],
        display_name: &str,
    ) -> Result<FileToken, ExchangeError> {
        let (_, extension) = split_name(display_name);

        let mut token = generate_token();
        while self.tokens.contains_key(&token) {
            token = generate_token();
        }

        let stored_name = format!("{}{}", token, extension);
        let storage_path = self.blobs.write(&stored_name, data).await?;

        let created_at = Utc::now();
        let entry = FileToken {
            token: token.clone(),
            stored_name,
            original_name: display_name.to_string(),
            storage_path,
            created_at,
            expires_at: created_at + self.ttl,
        };

        self.tokens.insert(token, entry.clone());
        tracing::info!(
            "issued token {} for {} ({} bytes)",
            entry.token,
            entry.original_name,
            data.len()
        );
        Ok(entry)
    }

    /// Returns the entry only while it is alive. A present-but-expired
    /// entry is removed (blob included) and reported as absent.
    pub async fn lookup(&self, token: &str) -> Option<FileToken> {
        let entry = match self.tokens.get(token) {
            Some(guard) => guard.value().clone(),
            None => return None,
        };

        if entry.is_expired() {
            self.revoke(token).await;
            return None;
        }

        Some(entry)
    }

    /// Same expiry semantics as `lookup`, without implying the caller will
    /// consume the blob.
    pub async fn describe(&self, token: &str) -> Option<FileToken> {
        self.lookup(token).await
    }

    pub async fn read(&self, entry: &FileToken) -> Result<Vec<u8>, ExchangeError> {
        self.blobs.read(&entry.storage_path).await
    }

    /// Unconditional removal of the entry and its blob. Revoking an absent
    /// token is a no-op.
    pub async fn revoke(&self, token: &str) {
        if let Some((_, entry)) = self.tokens.remove(token) {
            if let Err(e) = self.blobs.delete(&entry.storage_path).await {
                tracing::error!(
                    "failed to delete blob {}: {}",
                    entry.storage_path.display(),
                    e
                );
            } else {
                tracing::info!("removed token {} ({})", entry.token, entry.original_name);
            }
        }
    }

    /// Snapshot of the currently expired tokens. Collection is separate
    /// from eviction so the reaper never deletes files while iterating the
    /// map.
    pub fn expired_tokens(&self) -> Vec<String> {
        self.tokens
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect()
    }
}
