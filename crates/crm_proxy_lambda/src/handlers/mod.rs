pub mod create_client;
pub mod dispatch;
pub mod operations;
