//! User review preferences.

use crate::error::ResurfaceResult;
use crate::types::{ReviewUserSetting, UserId};

/// Storage for per-user review settings.
pub trait UserSettingStore: Send + Sync {
    /// Get the user's review setting, if one was ever saved.
    fn get_review_setting(&self, user_id: UserId) -> ResurfaceResult<Option<ReviewUserSetting>>;

    /// Create or replace the user's review setting.
    fn upsert_review_setting(
        &self,
        user_id: UserId,
        setting: &ReviewUserSetting,
    ) -> ResurfaceResult<()>;
}
