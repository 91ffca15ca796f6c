pub mod listing;

pub use listing::{CancelFlag, HarvestReport, ListingCrawler, StopReason};
