pub mod activity;
pub mod config;
pub mod economy;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod lifecycle;
pub mod storage;
pub mod types;

pub use config::Config;
pub use engine::{Driver, Workforce};
pub use error::{Result, WorkforceError};
pub use types::*;
