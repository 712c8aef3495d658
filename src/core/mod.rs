//! Core domain types and provider abstractions

pub mod config;
pub mod error;
pub mod listing;
pub mod log;
pub mod normalise;
pub mod provider;
pub mod session;
pub mod table;

// Re-export main types for cleaner imports
pub use error::{Error, ProviderKind};
pub use listing::{Listing, ListingOrder, PostRow};
pub use normalise::{NormalisationSkipped, apply_normalisation, normalise};
pub use provider::{DiscussionProvider, Interval, MarketDataProvider, ShortInterestProvider};
pub use session::{HistoryRequest, QuerySession, SeriesRequest};
pub use table::{ColumnData, TimeSeriesTable};
