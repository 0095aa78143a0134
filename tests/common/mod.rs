use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(200);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const ITEMS_HIGH: usize = 1000;
