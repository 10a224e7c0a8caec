pub mod guardian;
pub mod newsapi;
pub mod traits;

pub use guardian::GuardianProvider;
pub use newsapi::NewsApiProvider;
pub use traits::{AdapterError, ArticleQuery, PageWindow, ProviderAdapter, MISSING_TITLE};
