use std::sync::Arc;

use schooldesk_config::{CorsConfig, LibraryPolicy};
use schooldesk_db::PgPool;

use crate::modules::attendance::postgres::PgAttendanceRepository;
use crate::modules::attendance::repository::AttendanceRepository;
use crate::modules::circulation::postgres::PgCirculationRepository;
use crate::modules::circulation::repository::CirculationRepository;

#[derive(Clone)]
pub struct AppState {
    pub circulation_repo: Arc<dyn CirculationRepository>,
    pub attendance_repo: Arc<dyn AttendanceRepository>,
    pub library_policy: LibraryPolicy,
    pub cors_config: CorsConfig,
}

impl AppState {
    /// State backed by PostgreSQL, with configuration read from the environment.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            circulation_repo: Arc::new(PgCirculationRepository::new(pool.clone())),
            attendance_repo: Arc::new(PgAttendanceRepository::new(pool)),
            library_policy: LibraryPolicy::from_env(),
            cors_config: CorsConfig::from_env(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("library_policy", &self.library_policy)
            .field("cors_config", &self.cors_config)
            .finish_non_exhaustive()
    }
}
