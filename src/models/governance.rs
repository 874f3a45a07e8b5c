//! Governance and auth DTOs

use crate::policy::{CuratorPolicy, Role};
use crate::registry::Caller;
use serde::Deserialize;
use validator::Validate;

/// Grant or revoke a role
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    #[validate(length(
        min = 1,
        max = 128,
        message = "Member id must be between 1 and 128 characters"
    ))]
    pub member: String,
    pub role: Role,
}

/// Stage a migration to a freshly configured curator policy
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StageMigrationRequest {
    #[validate(length(
        min = 1,
        max = 128,
        message = "Governor id must be between 1 and 128 characters"
    ))]
    pub governor: String,

    #[serde(default)]
    pub curators: Vec<String>,

    #[serde(default)]
    pub trusted_delegates: Vec<String>,

    #[serde(default = "default_open_submissions")]
    pub open_submissions: bool,
}

fn default_open_submissions() -> bool {
    true
}

impl StageMigrationRequest {
    pub fn into_policy(self) -> CuratorPolicy {
        CuratorPolicy::new(Caller::new(self.governor))
            .with_curators(self.curators.into_iter().map(Caller::new))
            .with_trusted_delegates(self.trusted_delegates.into_iter().map(Caller::new))
            .with_open_submissions(self.open_submissions)
    }
}

/// Mint a development token
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DevTokenRequest {
    #[validate(length(
        min = 1,
        max = 128,
        message = "Caller id must be between 1 and 128 characters"
    ))]
    pub caller: String,

    #[validate(range(min = 1, max = 1440, message = "ttlMinutes must be between 1 and 1440"))]
    pub ttl_minutes: Option<i64>,
}
