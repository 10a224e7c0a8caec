pub mod ranker;
pub mod top_stories;

pub use ranker::{recency_score, RankOptions, RankedArticle, Ranker};
pub use top_stories::TopStories;
