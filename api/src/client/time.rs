use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

/// Card timestamp label relative to `now`, in `now`'s timezone:
/// `today HH:MM`, `yesterday HH:MM`, otherwise `YYYY-MM-DD HH:MM`.
///
/// Days are compared as calendar dates, so 23:50 yesterday is "yesterday"
/// even when only a few minutes have passed.
pub fn format_relative<Tz>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = ts.with_timezone(&now.timezone());
    let days = now
        .date_naive()
        .signed_duration_since(local.date_naive())
        .num_days();

    match days {
        0 => format!("today {}", local.format("%H:%M")),
        1 => format!("yesterday {}", local.format("%H:%M")),
        _ => local.format("%Y-%m-%d %H:%M").to_string(),
    }
}

/// [`format_relative`] against the machine's clock and timezone.
pub fn format_local(ts: &DateTime<Utc>) -> String {
    format_relative(ts, &Local::now())
}
