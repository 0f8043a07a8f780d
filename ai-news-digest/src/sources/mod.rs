pub mod feed_source;
pub mod hn_search;
pub mod reddit_feed;

pub use feed_source::FeedSource;
pub use hn_search::HackerNewsSearch;
pub use reddit_feed::SubredditFeeds;

use crate::config::SourceCatalog;
use crate::traits::PullSource;

/// Instantiates every source in the catalog, newsletters first.
pub fn from_catalog(catalog: &SourceCatalog) -> Vec<Box<dyn PullSource>> {
    let mut sources: Vec<Box<dyn PullSource>> = Vec::new();

    for spec in catalog.newsletters.iter().chain(catalog.feeds.iter()) {
        sources.push(Box::new(FeedSource::new(spec.clone())));
    }
    if let Some(search) = &catalog.search {
        sources.push(Box::new(HackerNewsSearch::new(search.clone())));
    }
    if let Some(reddit) = &catalog.reddit {
        sources.push(Box::new(SubredditFeeds::new(reddit.clone())));
    }

    sources
}
