//! Scoped transaction handling.

use tracing::warn;

use lode_core::LodeResult;
use lode_store::{Backend, Connection};

/// Run one factory operation inside a single transaction.
///
/// Exactly one of commit/abort happens on every exit path: the closure's
/// success commits, any failure (including a failed commit) aborts before
/// the error propagates.
pub(crate) fn with_connection<T>(
    backend: &dyn Backend,
    f: impl FnOnce(&mut dyn Connection) -> LodeResult<T>,
) -> LodeResult<T> {
    let mut conn = backend.connect()?;
    match f(conn.as_mut()) {
        Ok(value) => match conn.commit() {
            Ok(()) => Ok(value),
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "commit failed; aborting");
                conn.abort().ok();
                Err(e)
            }
        },
        Err(e) => {
            warn!(backend = backend.name(), error = %e, "operation failed; aborting");
            conn.abort().ok();
            Err(e)
        }
    }
}
