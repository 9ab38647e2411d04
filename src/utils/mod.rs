pub mod clock;
pub mod dir;
pub mod event_log;
pub mod logging;
pub mod runtime;
pub mod time;
