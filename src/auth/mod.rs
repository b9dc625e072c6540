//! API-key authentication and rate limiting at the serving boundary.
//!
//! The pipeline never authenticates anything; serving layers ask an
//! [`ApiKeyGate`] who a caller is and whether they are within quota, and
//! the answer decides what may be returned. Anonymous access is a valid
//! path, not a failure. The two failure kinds stay distinct: a credential
//! problem ("you are not who you claim") and a rate-limit problem ("you
//! are who you claim, but throttled") map to different client responses.
//!
//! Keys are never stored in the clear. A key is shown once at issuance;
//! lookups go through its SHA-256 digest, and only a short display prefix
//! survives for support tooling.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Prefix carried by every issued key.
pub const KEY_PREFIX: &str = "gate_";

/// Shortest credential worth hashing. Issued secrets are far longer.
const MIN_KEY_LEN: usize = KEY_PREFIX.len() + 32;

/// Characters of a key kept for display after issuance.
const DISPLAY_PREFIX_LEN: usize = 12;

/// Rolling request-count window.
const WINDOW_HOURS: i64 = 24;

// ── Tiers ───────────────────────────────────────────────────────────────────

/// Access tier, ordered lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Anonymous and entry-level keys.
    Free,
    /// Paid entry tier.
    Starter,
    /// High-volume tier.
    Pro,
}

impl Tier {
    /// Requests allowed per rolling 24-hour window.
    #[must_use]
    pub fn quota(self) -> u32 {
        match self {
            Self::Free => 100,
            Self::Starter => 5_000,
            Self::Pro => 50_000,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Starter => write!(f, "starter"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Why a presented credential was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Wrong shape: the required prefix is missing or the key is too short.
    #[error("malformed API key")]
    Malformed,
    /// No live key matches the credential.
    #[error("unknown API key")]
    Unknown,
    /// The key exists but has been revoked.
    #[error("API key revoked")]
    Revoked,
    /// The key exists but its expiry has passed.
    #[error("API key expired")]
    Expired,
}

/// Authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The caller is not who they claim.
    #[error("credential rejected: {0}")]
    Credential(#[from] CredentialError),
    /// The caller is authenticated but over quota.
    #[error("rate limit exceeded: {quota} requests per 24h on the {tier} tier")]
    RateLimited {
        /// Tier whose quota was reached.
        tier: Tier,
        /// The quota itself.
        quota: u32,
    },
}

// ── Access checks ───────────────────────────────────────────────────────────

/// Outcome of one authentication check.
///
/// `authenticated` and `error` vary independently: anonymous callers are
/// unauthenticated with no error, and rate-limited callers are
/// authenticated with an error. `key_id` resolves exactly when a live
/// credential was matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    /// Whether a live credential was resolved.
    pub authenticated: bool,
    /// Effective tier for this request.
    pub tier: Tier,
    /// Opaque identity of the matched key.
    pub key_id: Option<String>,
    /// What went wrong, if anything.
    pub error: Option<AuthError>,
}

impl AccessCheck {
    /// The anonymous outcome: free tier, no credential, no error.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            tier: Tier::Free,
            key_id: None,
            error: None,
        }
    }

    /// Whether the request may proceed.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.error.is_none()
    }

    fn rejected(error: CredentialError) -> Self {
        Self {
            authenticated: false,
            tier: Tier::Free,
            key_id: None,
            error: Some(AuthError::Credential(error)),
        }
    }
}

/// Authentication seam between serving layers and credential storage.
///
/// Async so database-backed implementations fit behind the same interface
/// as the in-memory store.
#[async_trait]
pub trait ApiKeyGate: Send + Sync {
    /// Resolve an optional bearer credential to an access decision.
    ///
    /// `bearer` is the raw header value; a `Bearer ` prefix is accepted
    /// and stripped. `None` is the anonymous path.
    async fn authenticate(&self, bearer: Option<&str>) -> AccessCheck;
}

// ── Key material ────────────────────────────────────────────────────────────

/// A freshly issued key. The secret appears here once and is never stored.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    /// Full secret, shown once at issuance.
    pub secret: String,
    /// Opaque identity used in logs and lookups.
    pub key_id: String,
    /// Leading characters of the secret, for display and support lookups.
    pub display_prefix: String,
}

/// SHA-256 hex digest of a full key.
#[must_use]
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn generate_secret() -> String {
    // Two v4 UUIDs: 244 random bits behind the prefix.
    format!(
        "{KEY_PREFIX}{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

// ── In-memory store ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct KeyEntry {
    key_id: String,
    tier: Tier,
    revoked: bool,
    expires_at: Option<DateTime<Utc>>,
    requests: Vec<DateTime<Utc>>,
}

/// In-memory [`ApiKeyGate`] keyed by credential digest.
///
/// Request timestamps are pruned to the rolling window on every check.
/// The lock covers a single map operation and is never held across an
/// await point.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, KeyEntry>>,
}

impl MemoryKeyStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new key on `tier`, optionally expiring at `expires_at`.
    pub fn issue(&self, tier: Tier, expires_at: Option<DateTime<Utc>>) -> IssuedKey {
        let secret = generate_secret();
        let key_id = Uuid::new_v4().to_string();
        let display_prefix = secret.chars().take(DISPLAY_PREFIX_LEN).collect();

        self.lock().insert(
            hash_key(&secret),
            KeyEntry {
                key_id: key_id.clone(),
                tier,
                revoked: false,
                expires_at,
                requests: Vec::new(),
            },
        );

        IssuedKey {
            secret,
            key_id,
            display_prefix,
        }
    }

    /// Revoke the key with `key_id`. Returns whether a key was found.
    pub fn revoke(&self, key_id: &str) -> bool {
        let mut keys = self.lock();
        for entry in keys.values_mut() {
            if entry.key_id == key_id {
                entry.revoked = true;
                return true;
            }
        }
        false
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, KeyEntry>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ApiKeyGate for MemoryKeyStore {
    async fn authenticate(&self, bearer: Option<&str>) -> AccessCheck {
        let Some(raw) = bearer else {
            return AccessCheck::anonymous();
        };
        let key = raw.strip_prefix("Bearer ").unwrap_or(raw);

        if !key.starts_with(KEY_PREFIX) || key.len() < MIN_KEY_LEN {
            return AccessCheck::rejected(CredentialError::Malformed);
        }

        let digest = hash_key(key);
        let now = Utc::now();
        let mut keys = self.lock();

        let Some(entry) = keys.get_mut(&digest) else {
            return AccessCheck::rejected(CredentialError::Unknown);
        };
        if entry.revoked {
            return AccessCheck::rejected(CredentialError::Revoked);
        }
        if let Some(expires_at) = entry.expires_at {
            if expires_at < now {
                return AccessCheck::rejected(CredentialError::Expired);
            }
        }

        let cutoff = now - Duration::hours(WINDOW_HOURS);
        entry.requests.retain(|t| *t > cutoff);

        let quota = entry.tier.quota();
        if entry.requests.len() as u64 >= u64::from(quota) {
            return AccessCheck {
                authenticated: true,
                tier: entry.tier,
                key_id: Some(entry.key_id.clone()),
                error: Some(AuthError::RateLimited {
                    tier: entry.tier,
                    quota,
                }),
            };
        }

        entry.requests.push(now);
        AccessCheck {
            authenticated: true,
            tier: entry.tier,
            key_id: Some(entry.key_id.clone()),
            error: None,
        }
    }
}
