pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{begin_immediate, connect, connect_with_settings, DbPool};
