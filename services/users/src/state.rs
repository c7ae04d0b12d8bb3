//! Application state shared across handlers

use std::{path::PathBuf, sync::Arc};

use crate::repositories::UserRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_repository: UserRepository,
    pub seed_file: Arc<PathBuf>,
}
