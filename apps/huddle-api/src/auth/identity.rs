//! Resolution of the identity a client claims in its `authenticate` event.

use async_trait::async_trait;

use crate::error::StoreError;

/// Maps a claimed user id to the user the connection will be bound to.
///
/// `Ok(None)` means the claim is rejected.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, claimed_user_id: &str) -> Result<Option<String>, StoreError>;
}

/// Accepts any non-empty claimed id as-is.
///
/// Used when the application authenticates users upstream of the socket
/// (session cookie on the upgrade request) and forwards the id verbatim.
pub struct TrustedIdentity;

#[async_trait]
impl IdentityResolver for TrustedIdentity {
    async fn resolve(&self, claimed_user_id: &str) -> Result<Option<String>, StoreError> {
        let claimed = claimed_user_id.trim();
        if claimed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(claimed.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trusted_identity_trims_and_rejects_blank() {
        assert_eq!(TrustedIdentity.resolve(" usr_1 ").await.unwrap().as_deref(), Some("usr_1"));
        assert!(TrustedIdentity.resolve("   ").await.unwrap().is_none());
    }
}
