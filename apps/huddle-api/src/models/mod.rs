pub mod message;
pub mod participant;
