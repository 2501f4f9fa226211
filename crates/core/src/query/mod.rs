pub mod filter;
pub mod params;
pub mod router;

pub use filter::FeedFilter;
pub use params::QueryParams;
pub use router::resolve;
