use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;
use crate::model::rules::subscription_grace;

/// Pro entitlement record as last reported by the billing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub user_id: UserId,
    pub current_period_end: DateTime<Utc>,
}

impl UserSubscription {
    #[must_use]
    pub fn new(user_id: UserId, current_period_end: DateTime<Utc>) -> Self {
        Self {
            user_id,
            current_period_end,
        }
    }

    /// A subscription stays active for a one-day grace window past its period end.
    ///
    /// A period end too far in the future to add the grace to is treated as active.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.current_period_end
            .checked_add_signed(subscription_grace())
            .is_none_or(|end| end > now)
    }
}
