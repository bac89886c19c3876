//! Request/response bodies for the user profiles service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Asks for display names of a batch of users in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNamesForUsersRequest {
    pub user_ids: Vec<UserId>,
}

/// Reply mapping user id to display name.
///
/// Unresolvable ids are absent from the map; consumers substitute an
/// "unknown" sentinel rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNamesForUsersResponse {
    pub names: HashMap<UserId, String>,
}
