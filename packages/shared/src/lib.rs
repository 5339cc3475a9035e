//! Utilities shared by the codechat binaries: logging setup and the clock
//! abstraction.

pub mod logger;
pub mod time;
