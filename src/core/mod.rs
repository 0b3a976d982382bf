pub mod config;
pub mod error;
pub mod types;

pub use config::{config, set_config, CoreConfig};
pub use error::{CoreError, Result};
pub use types::{Timestamp, UnitId, UnitRef};
