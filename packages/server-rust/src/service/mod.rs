//! Business services composing storage with remote bus lookups.
//!
//! - `remote`: typed, batched gateway over the request/response client
//! - `articles`: the aggregation service producing the article views
//! - `views`: the view-counter service

pub mod articles;
pub mod remote;
pub mod views;

pub use articles::{ArticlesError, ArticlesService};
pub use remote::{BusRemoteLookups, RemoteLookups};
pub use views::ViewsService;
