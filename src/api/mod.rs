mod client;
mod cookies;
mod types;

pub use client::{find_match, parse_detail, parse_search_results, JavdbClient, SearchHit};
pub use cookies::{load_cookie_header, parse_cookie_file};
pub use types::{ApiConfig, ApiError, MatchStrictness, Metadata};

/// Source of catalog metadata for a video code
pub trait MetadataProvider {
    /// Look up `code` and return the catalog's metadata.
    ///
    /// The returned [`Metadata::code`] is the catalog's canonical spelling and
    /// may differ from the searched code.
    fn get_video_info(&self, code: &str) -> Result<Metadata, ApiError>;
}
