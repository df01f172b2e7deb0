//! Admin allow-list lookup.
//!
//! The core only sees a [`Principal`] with a role. Deciding that role from a
//! raw identity is the transport's job and happens here.

use qa_harness_core::models::Principal;

use crate::config::AuthConfig;

/// Identity used by the local `qa` CLI. Shell access to the database file
/// already implies admin rights.
pub const LOCAL_OPERATOR: &str = "local";

/// Resolve a principal for `user_id` against the configured admin list.
pub fn resolve_principal(auth: &AuthConfig, user_id: &str) -> Principal {
    if auth.admin_ids.iter().any(|id| id == user_id) {
        Principal::admin(user_id)
    } else {
        Principal::user(user_id)
    }
}

/// The principal for commands run through the local CLI.
pub fn local_operator() -> Principal {
    Principal::admin(LOCAL_OPERATOR)
}
