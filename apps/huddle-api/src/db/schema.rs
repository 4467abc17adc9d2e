// Tables owned by the surrounding application. Only the columns the chat
// delivery core reads or writes are declared here.

diesel::table! {
    users (id) {
        id -> Text,
        username -> Text,
    }
}

diesel::table! {
    chat_messages (id) {
        id -> Int8,
        chat_id -> Text,
        user_id -> Text,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_participants (chat_id, user_id) {
        chat_id -> Text,
        user_id -> Text,
        is_admin -> Bool,
        joined_at -> Timestamptz,
    }
}

diesel::joinable!(chat_messages -> users (user_id));
diesel::joinable!(chat_participants -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, chat_messages, chat_participants);
