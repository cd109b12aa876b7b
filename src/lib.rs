pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::db::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub auth_token_key: [u8; 32],
    pub auth_token_ttl_hours: u64,
    pub cookie_secure: bool,
}
