//! Routing decision persistence.
//!
//! # Example
//!
//! ```rust,no_run
//! use caregate_core::monitoring::SqliteRoutingLog;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let log = SqliteRoutingLog::open("caregate-routing.db")?;
//! println!("{} decisions logged", log.count()?);
//! # Ok(())
//! # }
//! ```

mod error;
mod routing_log;
pub(crate) mod schema;

pub use error::{MonitoringError, Result};
pub use routing_log::{MemoryRoutingLog, SqliteRoutingLog};
pub use schema::initialize_schema;
