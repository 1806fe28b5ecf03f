pub mod parser;
pub mod tier;

pub use parser::{min_interval, next_fire_after};
pub use tier::{validate_cron_interval, Tier as CronTier};
