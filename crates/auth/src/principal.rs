use serde::{Deserialize, Serialize};

use penboard_core::UserId;

/// The authenticated caller of a request.
///
/// Resolved from the store on every request so privilege changes and
/// deactivation take effect immediately.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub is_staff: bool,
}

impl Principal {
    pub fn new(user_id: UserId, is_staff: bool) -> Self {
        Self { user_id, is_staff }
    }

    pub fn is(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
