//! Call contracts for the three remote lookups the articles service makes.
//!
//! Each logical operation is a request/response body pair. Bodies are
//! MsgPack-encoded into an envelope payload (see [`crate::envelope`]);
//! the envelope, not the body, carries the correlation id.

pub mod comments;
pub mod users;

pub use comments::{
    CommentCountsForArticlesRequest, CommentCountsForArticlesResponse, CommentsForArticleRequest,
    CommentsForArticleResponse,
};
pub use users::{UserNamesForUsersRequest, UserNamesForUsersResponse};

/// Default request topic names, keyed by logical operation.
///
/// Deployments can override these through configuration; the constants
/// exist so the server and its test responders agree out of the box.
pub mod topics {
    /// Fetch the comments of a single article.
    pub const COMMENTS_FOR_ARTICLE: &str = "comments.list";
    /// Fetch comment counts for a batch of articles.
    pub const COMMENT_COUNTS_FOR_ARTICLES: &str = "comments.counts";
    /// Resolve display names for a batch of users.
    pub const USER_NAMES_FOR_USERS: &str = "users.names";
}
