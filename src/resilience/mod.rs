pub mod timeout;

pub use timeout::{run_logged, Deadline, TimeoutExt};
