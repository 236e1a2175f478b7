pub mod achievement;
pub mod aggregate;
pub mod challenge;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod models;
pub mod period;
pub mod platform;
pub mod ranking;
pub mod sanitize;
pub mod store;

pub use error::{PlatformError, Result};
pub use platform::Platform;
