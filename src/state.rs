use std::sync::Arc;

use crate::{
    config::CheckoutSettings,
    db::{DbPool, OrmConn, orm_from_pool},
    mailer::InvoiceMailer,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub checkout: Arc<CheckoutSettings>,
    pub mailer: InvoiceMailer,
}

impl AppState {
    pub fn new(pool: DbPool, checkout: CheckoutSettings, mailer: InvoiceMailer) -> Self {
        let orm = orm_from_pool(&pool);
        Self {
            pool,
            orm,
            checkout: Arc::new(checkout),
            mailer,
        }
    }
}
