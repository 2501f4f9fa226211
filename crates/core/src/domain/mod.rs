pub mod dashboard;
pub mod feed;
pub mod lenient;
pub mod snapshot;
pub mod ticker;
