//! Revocation registry: a persistent set of revoked jtis.
//!
//! Checked on every protected request after signature/expiry pass, so an
//! expired token is rejected by expiry alone and a valid-but-revoked token
//! is rejected here. Entries keep the token expiry so a maintenance sweep
//! can drop them once they are unverifiable anyway.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;

/// Mark a jti as revoked. Idempotent: revoking twice is a no-op.
pub async fn revoke(store: &dyn Store, jti: Uuid, expires_at: DateTime<Utc>) -> Result<()> {
    store.insert_revocation(jti, expires_at).await?;
    debug!(%jti, "token revoked");
    Ok(())
}

pub async fn is_revoked(store: &dyn Store, jti: Uuid) -> Result<bool> {
    Ok(store.is_jti_revoked(jti).await?)
}

/// Maintenance sweep: drop entries whose token expiry has passed. Safe
/// because an expired token already fails verification. Not on the hot
/// path; callers schedule this however they like.
pub async fn purge_expired(store: &dyn Store, now: DateTime<Utc>) -> Result<u64> {
    let purged = store.purge_expired_revocations(now).await?;
    if purged > 0 {
        debug!(purged, "pruned expired revocation entries");
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::{is_revoked, purge_expired, revoke};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = MemoryStore::new();
        let jti = Uuid::new_v4();
        let expires = Utc::now() + Duration::minutes(30);

        revoke(&store, jti, expires).await.unwrap();
        revoke(&store, jti, expires).await.unwrap();
        assert!(is_revoked(&store, jti).await.unwrap());
        assert!(!is_revoked(&store, Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let stale = Uuid::new_v4();
        let live = Uuid::new_v4();

        revoke(&store, stale, now - Duration::seconds(1)).await.unwrap();
        revoke(&store, live, now + Duration::minutes(10)).await.unwrap();

        assert_eq!(purge_expired(&store, now).await.unwrap(), 1);
        assert!(!is_revoked(&store, stale).await.unwrap());
        assert!(is_revoked(&store, live).await.unwrap());
    }
}
