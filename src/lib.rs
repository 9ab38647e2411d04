//! Small cli/daemon that keeps track of a few daily habits: taking creatine, drinking water and
//! reapplying sunscreen. The daemon resets everything at midnight and reminds about water and
//! sunscreen during the day, while the cli records what was done.
//!

pub mod autostart;
pub mod cli;
pub mod daemon;
pub mod notification;
pub mod utils;
