//! Entity identifiers, the comment record, and pagination types.
//!
//! Ids are UUID newtypes so an `ArticleId` can never be passed where a
//! `UserId` is expected. All types serialize with `camelCase` field names
//! to stay wire-compatible between the JSON (HTTP) and `MsgPack` (bus)
//! surfaces.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size applied when a caller asks for `take == 0`.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on a single page; larger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mints a fresh random (v4) id.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Identifier of an article row.
    ArticleId
);

uuid_id!(
    /// Identifier of a user in the profiles service.
    UserId
);

uuid_id!(
    /// Identifier of a comment in the comments service.
    CommentId
);

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment as the comments service reports it over the bus.
///
/// Author display names are not part of this record; they are resolved
/// separately through the profiles service and merged by the aggregation
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub content: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Skip/take pagination parameters as received from a caller.
///
/// Raw values are kept as-is; [`PageParams::effective_take`] applies the
/// default and the clamp so every consumer agrees on the actual page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageParams {
    pub skip: u32,
    pub take: u32,
}

impl PageParams {
    #[must_use]
    pub fn new(skip: u32, take: u32) -> Self {
        Self { skip, take }
    }

    /// The page size actually applied: `take == 0` means
    /// [`DEFAULT_PAGE_SIZE`], anything above [`MAX_PAGE_SIZE`] is clamped.
    #[must_use]
    pub fn effective_take(&self) -> u32 {
        if self.take == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.take.min(MAX_PAGE_SIZE)
        }
    }
}

/// One page of items plus the total count across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    /// An empty page with a zero total.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
