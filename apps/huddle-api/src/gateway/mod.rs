pub mod events;
pub mod fanout;
pub mod outbox;
pub mod registry;
pub mod server;
pub mod session;
pub mod transport;
