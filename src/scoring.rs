//! Priority scoring.
//!
//! Two pure functions drive every ordering decision:
//!
//! - [`base_score`]: fixed at registration from category, urgency and
//!   appointment.
//! - [`current_score`]: base score plus an aging bonus for the time waited.
//!
//! # Aging
//!
//! | Wait (min) | Tier bonus | Extra for `Regular` |
//! |------------|------------|---------------------|
//! | < 10       | 0          | 0                   |
//! | 10–19      | +1         | 0                   |
//! | 20–24      | +3         | 0                   |
//! | 25–29      | +3         | +3                  |
//! | ≥ 30       | +5         | +3                  |
//!
//! Only one tier applies. The `Regular` bonus stacks on top of it so that
//! low-base customers cannot starve behind a stream of higher categories.
//!
//! Nothing here reads the clock: the evaluation instant is always passed in.
//! Arithmetic saturates at the `i64` bounds, so every input has a score.

use chrono::{DateTime, Utc};

use crate::models::Category;

/// Points awarded per urgency level.
pub const URGENCY_WEIGHT: i64 = 2;
/// Points awarded for holding an appointment.
pub const APPOINTMENT_BONUS: i64 = 2;
/// Extra points for `Regular` customers waiting at least [`REGULAR_BONUS_MINUTES`].
pub const REGULAR_BONUS: i64 = 3;
/// Wait after which the `Regular` bonus applies.
pub const REGULAR_BONUS_MINUTES: i64 = 25;
/// Largest bonus any customer can accumulate by waiting.
pub const MAX_AGING_BONUS: i64 = 5 + REGULAR_BONUS;

const AGING_TIERS: [(i64, i64); 3] = [(30, 5), (20, 3), (10, 1)];

/// Registration-time points for a category. Unknown categories score as `Regular`.
pub fn category_points(category: &Category) -> i64 {
    match category {
        Category::Pwd => 5,
        Category::SeniorCitizen | Category::Pregnant => 4,
        Category::Regular | Category::Other(_) => 1,
    }
}

/// Computes the immutable base score.
///
/// # Example
/// ```
/// use walkin_queue::models::Category;
/// use walkin_queue::scoring::base_score;
///
/// assert_eq!(base_score(&Category::Pwd, 3, true), 13);
/// assert_eq!(base_score(&Category::Regular, 1, false), 3);
/// ```
pub fn base_score(category: &Category, urgency_level: i64, has_appointment: bool) -> i64 {
    let appointment = if has_appointment { APPOINTMENT_BONUS } else { 0 };
    category_points(category)
        .saturating_add(urgency_level.saturating_mul(URGENCY_WEIGHT))
        .saturating_add(appointment)
}

/// Tier bonus for a wait (not including the `Regular` bonus).
pub fn aging_bonus(wait_minutes: i64) -> i64 {
    AGING_TIERS
        .iter()
        .find(|(threshold, _)| wait_minutes >= *threshold)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}

/// Whole minutes waited between `arrival` and `evaluated_at`.
///
/// Floors partial minutes. An arrival later than the evaluation instant
/// counts as zero minutes.
pub fn wait_minutes(arrival: DateTime<Utc>, evaluated_at: DateTime<Utc>) -> i64 {
    (evaluated_at - arrival).num_minutes().max(0)
}

/// Current score for a wait. Returns `(score, wait_minutes)`.
pub fn current_score(base_score: i64, category: &Category, wait_minutes: i64) -> (i64, i64) {
    let mut score = base_score.saturating_add(aging_bonus(wait_minutes));
    if category.is_regular() && wait_minutes >= REGULAR_BONUS_MINUTES {
        score = score.saturating_add(REGULAR_BONUS);
    }
    (score, wait_minutes)
}

/// [`current_score`] for a customer who arrived at `arrival`.
pub fn current_score_at(
    base_score: i64,
    category: &Category,
    arrival: DateTime<Utc>,
    evaluated_at: DateTime<Utc>,
) -> (i64, i64) {
    current_score(base_score, category, wait_minutes(arrival, evaluated_at))
}
