use sqlx::PgPool;

/// Shared by every handler; the pool hands out one connection per statement.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
