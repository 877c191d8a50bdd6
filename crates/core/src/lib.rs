#![forbid(unsafe_code)]

pub mod extract;
pub mod model;
pub mod prompt;
pub mod taxonomy;
pub mod time;

pub use time::Clock;
