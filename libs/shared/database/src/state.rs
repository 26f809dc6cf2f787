use shared_config::AppConfig;

use crate::supabase::SupabaseClient;

/// Process-wide dependencies, built once at startup and handed to every
/// router through `State<Arc<AppState>>`.
pub struct AppState {
    pub config: AppConfig,
    pub db: SupabaseClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let db = SupabaseClient::new(&config);
        Self { config, db }
    }
}
