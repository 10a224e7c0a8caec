pub mod news;

pub use news::{NewsService, ServiceStats};
