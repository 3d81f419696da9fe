use std::{sync::Arc, time::Instant};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::{
        cookie::SessionCookie,
        jwt::JwtKeys,
        repo::{PgUserStore, UserStore},
    },
    config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub cookie: SessionCookie,
    pub started_at: Instant,
}

impl AppState {
    /// Connect the pool and wire the Postgres-backed store.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, PgPool)> {
        let db = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        Ok((Self::from_parts(users, Arc::new(config)), db))
    }

    pub fn from_parts(users: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self {
            users,
            keys: JwtKeys::new(&config.jwt),
            cookie: SessionCookie::new(&config.cookie),
            config,
            started_at: Instant::now(),
        }
    }
}
