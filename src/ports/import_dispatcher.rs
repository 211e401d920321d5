use std::path::PathBuf;

/// Port for handing an uploaded archive off to be imported later.
///
/// `dispatch` returns immediately; the outcome of the import is only logged.
/// Implementations live in `services::background` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
pub trait ImportDispatcher: Send + Sync {
    fn dispatch(&self, archive_path: PathBuf);
}
