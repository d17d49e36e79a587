//! Schema bootstrap, backup rotation and liveness supervision (spec.md §4.G).

mod backup;
mod error;
mod health;
mod schema;

pub use backup::{run_backup_task, BackupConfig};
pub use error::SupervisorError;
pub use health::{run_health_task, HealthConfig};
pub use schema::bootstrap;
