use std::path::PathBuf;
use std::sync::Arc;

use crate::database::Database;
use crate::ports::import_dispatcher::ImportDispatcher;

pub struct AppState {
    pub db: Arc<Database>,
    pub media_directory: PathBuf,
    pub import_dispatcher: Arc<dyn ImportDispatcher>,
    pub upload_limit_bytes: usize,
}
