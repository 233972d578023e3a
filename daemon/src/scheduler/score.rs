use chrono::NaiveDateTime;
use pocketd_common::api::v1::{Pocket, Urgency};
use pocketd_common::config::SchedulerConfig;

/// Dispatch priority of a waiting ticket.
///
/// Urgency sets the base, every `age_bonus_interval` minutes in the queue
/// add a point up to `max_age_bonus`, security builds get a flat bonus.
pub fn compute(
    urgency: Urgency,
    pocket: Pocket,
    queued_at: NaiveDateTime,
    now: NaiveDateTime,
    config: &SchedulerConfig,
) -> i32 {
    let age_minutes = (now - queued_at).num_minutes().max(0);
    let age_bonus = (age_minutes / config.age_bonus_interval())
        .min(config.max_age_bonus() as i64) as i32;

    let pocket_bonus = if pocket == Pocket::Security {
        config.security_bonus()
    } else {
        0
    };

    urgency.base_score() + age_bonus + pocket_bonus
}
