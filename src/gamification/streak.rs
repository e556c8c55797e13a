use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
  pub current: i64,
  pub longest: i64,
  pub last_study_date: Option<NaiveDate>,
}

/// How a recorded activity moved the streak. Only used for logging; the API
/// reports the resulting counters, not the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
  SameDay,
  Extended,
  Reset,
}

/// Apply one study day to the streak.
///
/// Yesterday extends the streak. Today leaves it as is. Anything else (never
/// studied, a gap, or a date in the future) starts over at 1.
pub fn advance_streak(streak: Streak, today: NaiveDate) -> (Streak, StreakChange) {
  let yesterday = today - Duration::days(1);

  let (current, longest, change) = match streak.last_study_date {
    Some(last) if last == today => (streak.current, streak.longest, StreakChange::SameDay),
    Some(last) if last == yesterday => {
      let current = streak.current + 1;
      (current, streak.longest.max(current), StreakChange::Extended)
    }
    _ => (1, streak.longest.max(1), StreakChange::Reset),
  };

  (
    Streak {
      current,
      longest,
      last_study_date: Some(today),
    },
    change,
  )
}
