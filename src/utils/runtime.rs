use anyhow::Result;

/// The daemon is a handful of mostly sleeping loops, a single thread is plenty.
pub fn daemon_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .thread_name("dailytrack-daemon")
        .enable_all()
        .build()?)
}
