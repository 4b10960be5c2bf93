pub mod connection;
pub mod ws;
