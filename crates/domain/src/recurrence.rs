use crate::reminder::Reminder;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// The part of a `Reminder` which decides when its occurrences are due.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub is_active: bool,
    pub start: DateTime<Utc>,
    /// `None` for one-shot reminders
    pub period: Option<Duration>,
    /// First instant after the last day the reminder is allowed to fire on.
    pub ends_before: Option<DateTime<Utc>>,
}

impl Recurrence {
    pub fn from_reminder(reminder: &Reminder, tz: &Tz) -> Self {
        Self {
            is_active: reminder.is_active,
            start: reminder.start_date,
            period: reminder.effective_periodicity().map(Duration::minutes),
            ends_before: reminder
                .end_date
                .and_then(|end_date| start_of_next_day(end_date, tz)),
        }
    }

    pub fn is_one_shot(&self) -> bool {
        self.period.is_none()
    }

    fn is_within_end(&self, at: DateTime<Utc>) -> bool {
        match self.ends_before {
            Some(ends_before) => at < ends_before,
            None => true,
        }
    }

    /// Computes the next instant at which an occurrence is due, given the
    /// scheduled time of the most recent occurrence generated for this rule.
    ///
    /// At most one instant is returned per call. A rule that has fallen
    /// behind catches up one period per call.
    pub fn next_due(
        &self,
        most_recent: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !self.is_active || self.start > now || !self.is_within_end(now) {
            return None;
        }

        let candidate = match (self.period, most_recent) {
            (_, None) => self.start,
            // One-shot rules fire exactly once
            (None, Some(_)) => return None,
            (Some(period), Some(latest)) => latest + period,
        };

        if candidate <= now && self.is_within_end(candidate) {
            Some(candidate)
        } else {
            None
        }
    }

    /// Expands the rule into at most `limit` instants strictly after `after`,
    /// keeping the phase of the start date.
    pub fn upcoming(&self, after: DateTime<Utc>, limit: usize) -> Vec<DateTime<Utc>> {
        let mut instants = Vec::new();
        if !self.is_active || limit == 0 {
            return instants;
        }

        let period = match self.period {
            Some(period) => period,
            None => {
                if self.start > after && self.is_within_end(self.start) {
                    instants.push(self.start);
                }
                return instants;
            }
        };

        let period_millis = period.num_milliseconds();
        if period_millis <= 0 {
            return instants;
        }

        let mut next = if self.start > after {
            self.start
        } else {
            let elapsed = (after - self.start).num_milliseconds();
            let steps = elapsed / period_millis + 1;
            self.start + Duration::milliseconds(period_millis * steps)
        };

        while instants.len() < limit && self.is_within_end(next) {
            instants.push(next);
            next = next + period;
        }

        instants
    }
}

/// Midnight following `date` in `tz`, expressed in UTC.
fn start_of_next_day(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let midnight = date.succ_opt()?.and_hms_opt(0, 0, 0)?;
    let bound = match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight was skipped by a DST transition
        LocalResult::None => Utc.from_utc_datetime(&midnight) - tz_offset_guess(tz, &midnight),
    };
    Some(bound)
}

fn tz_offset_guess(tz: &Tz, naive: &chrono::NaiveDateTime) -> Duration {
    use chrono::Offset;
    let offset = tz.offset_from_utc_datetime(naive).fix();
    Duration::seconds(offset.local_minus_utc() as i64)
}
