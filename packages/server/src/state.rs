use std::sync::Arc;

use common::MediaStore;
use sea_orm::DatabaseConnection;
use tokio::sync::RwLock;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub media: Arc<dyn MediaStore>,
    /// Uploads hold this shared until their recipe row is committed; deleting
    /// an unreferenced image holds it exclusively. Content-addressed files
    /// are shared, so a delete must not slip between another request's
    /// `put` of the same bytes and the commit that references them.
    pub image_gate: Arc<RwLock<()>>,
}
