//! Shared handler state.

use itrack_db::Database;

use crate::auth::TokenIssuer;
use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: TokenIssuer,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(db: Database, config: &ApiConfig) -> Self {
        Self {
            db,
            tokens: TokenIssuer::new(&config.jwt_secret, config.jwt_expires_in),
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}
