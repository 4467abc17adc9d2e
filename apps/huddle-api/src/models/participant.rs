use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::db::schema::chat_participants;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = chat_participants)]
#[serde(rename_all = "camelCase")]
pub struct ChatParticipant {
    pub chat_id: String,
    pub user_id: String,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}
