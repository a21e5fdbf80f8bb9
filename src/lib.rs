pub mod api;
pub mod cli;
pub mod error;
pub mod intercept;
pub mod limiters;
pub mod room;
pub mod settings;

pub use error::{MurmurError, Result};
