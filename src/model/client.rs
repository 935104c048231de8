use std::collections::BTreeSet;

use serde::Serialize;

/// Username shown for clients that connected without credentials.
pub const ANONYMOUS: &str = "anonymous";

/// A client connected to the broker, keyed by `client_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub client_id: String,
    pub username: String,
    pub connected_at: String,
    pub subscriptions: BTreeSet<String>,
}
