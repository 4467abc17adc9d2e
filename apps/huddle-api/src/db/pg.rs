//! Postgres-backed collaborators built on Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use diesel_async::RunQueryDsl;

use crate::auth::identity::IdentityResolver;
use crate::db::pool::DbPool;
use crate::db::schema::{chat_messages, chat_participants, users};
use crate::db::store::ChatStore;
use crate::error::StoreError;
use crate::models::message::ChatMessage;
use crate::models::participant::ChatParticipant;

#[derive(Clone)]
pub struct PgChatStore {
    pool: DbPool,
}

impl PgChatStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        diesel::insert_into(chat_messages::table)
            .values(message)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_participants(&self, chat_id: &str) -> Result<Vec<ChatParticipant>, StoreError> {
        let mut conn = self.pool.get().await?;
        let participants = chat_participants::table
            .filter(chat_participants::chat_id.eq(chat_id))
            .order(chat_participants::joined_at.asc())
            .select(ChatParticipant::as_select())
            .load(&mut conn)
            .await?;
        Ok(participants)
    }
}

#[async_trait]
impl IdentityResolver for PgChatStore {
    async fn resolve(&self, claimed_user_id: &str) -> Result<Option<String>, StoreError> {
        let claimed = claimed_user_id.trim();
        if claimed.is_empty() {
            return Ok(None);
        }

        let mut conn = self.pool.get().await?;
        let found = users::table
            .find(claimed)
            .select(users::id)
            .get_result::<String>(&mut conn)
            .await
            .optional()?;
        Ok(found)
    }
}
