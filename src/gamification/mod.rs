//! XP awards, plant-growth levels and daily study streaks.

pub mod levels;
pub mod streak;
pub mod xp;

pub use levels::{calculate_level, Level, LevelInfo, LEVELS};
pub use streak::{advance_streak, Streak, StreakChange};
pub use xp::{xp_for_mode, StudyMode, DEFAULT_XP};
