use anyhow::Result;

use crate::daemon::event::DaemonEvent;

/// Represents the foreground side of the daemon. Everything a background task wants shown to the
/// user goes through an implementation of this trait.
pub trait EventProcessor {
    fn process_next(&mut self, event: DaemonEvent) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
