//! Keys for toggleable user relations (follow, community membership, list membership).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKey {
    Follow { user_id: i64 },
    CommunityMembership { community_id: i64 },
    ListMembership { list_id: i64, user_id: i64 },
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKey::Follow { user_id } => write!(f, "follow:{}", user_id),
            RelationKey::CommunityMembership { community_id } => {
                write!(f, "community:{}", community_id)
            }
            RelationKey::ListMembership { list_id, user_id } => {
                write!(f, "list:{}:{}", list_id, user_id)
            }
        }
    }
}
