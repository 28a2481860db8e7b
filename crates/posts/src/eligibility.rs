//! Who may author posts.

use chrono::NaiveDate;

use penboard_core::ValidationErrors;
use penboard_users::is_adult;

pub const MINIMUM_POSTING_AGE: i32 = 18;

/// Authors must be at least [`MINIMUM_POSTING_AGE`] on `today`.
pub fn ensure_can_post(birth_date: NaiveDate, today: NaiveDate) -> Result<(), ValidationErrors> {
    if is_adult(birth_date, today, MINIMUM_POSTING_AGE) {
        Ok(())
    } else {
        Err(ValidationErrors::non_field(format!(
            "User must be at least {MINIMUM_POSTING_AGE} years old to create a post."
        )))
    }
}
