//! Anonymous identity.
//!
//! Sessions carry nothing but an opaque user id, used to tag complaint
//! authorship and to filter "My Reports". There is no sign-out and no
//! account linking.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::model::AnonymousSession;

/// Source of anonymous sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_anonymously(&self) -> Result<AnonymousSession>;
}

/// Issues random v4 UUIDs as user ids.
#[derive(Debug, Clone, Default)]
pub struct LocalIdentity;

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_in_anonymously(&self) -> Result<AnonymousSession> {
        let session = AnonymousSession {
            user_id: Uuid::new_v4().to_string(),
        };
        info!("Anonymous session created");
        Ok(session)
    }
}
