use serde::Serialize;

/// One row of the level table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
  pub level: i64,
  pub xp_threshold: i64,
  pub name: &'static str,
  pub plant_stage: i64,
}

/// Level table, ascending by threshold. Names are shown to users as-is.
pub const LEVELS: [Level; 6] = [
  Level { level: 1, xp_threshold: 0, name: "Semilla", plant_stage: 1 },
  Level { level: 2, xp_threshold: 50, name: "Brote", plant_stage: 2 },
  Level { level: 3, xp_threshold: 120, name: "Tallo Joven", plant_stage: 3 },
  Level { level: 4, xp_threshold: 250, name: "Planta Fuerte", plant_stage: 4 },
  Level { level: 5, xp_threshold: 500, name: "Floración", plant_stage: 5 },
  Level { level: 6, xp_threshold: 1000, name: "Árbol Sabio", plant_stage: 6 },
];

/// Level resolved from accumulated XP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
  pub current_level: i64,
  pub level_name: &'static str,
  pub plant_stage: i64,
  pub progress_percentage: i64,
  pub current_xp: i64,
  pub next_level_xp: i64,
  pub xp_for_next_level: i64,
}

/// Resolve the level for `total_xp`.
///
/// Picks the highest level whose threshold is at or below `total_xp`; anything
/// below the first threshold resolves to level 1.
pub fn calculate_level(total_xp: i64) -> LevelInfo {
  let current = LEVELS
    .iter()
    .rev()
    .find(|l| total_xp >= l.xp_threshold)
    .unwrap_or(&LEVELS[0]);

  let next = LEVELS.iter().find(|l| l.level == current.level + 1);

  match next {
    Some(next) => {
      let span = next.xp_threshold - current.xp_threshold;
      let earned = (total_xp - current.xp_threshold).max(0);
      LevelInfo {
        current_level: current.level,
        level_name: current.name,
        plant_stage: current.plant_stage,
        progress_percentage: rounded_percent(earned, span),
        current_xp: total_xp,
        next_level_xp: next.xp_threshold,
        xp_for_next_level: next.xp_threshold - total_xp.max(0),
      }
    }
    None => LevelInfo {
      current_level: current.level,
      level_name: current.name,
      plant_stage: current.plant_stage,
      progress_percentage: 100,
      current_xp: total_xp,
      next_level_xp: total_xp,
      xp_for_next_level: 0,
    },
  }
}

/// `round(part / whole * 100)` with halves rounded up, in integer arithmetic
fn rounded_percent(part: i64, whole: i64) -> i64 {
  if whole <= 0 {
    return 100;
  }
  (part * 200 + whole) / (whole * 2)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_zero_xp() {
    let info = calculate_level(0);
    assert_eq!(info.current_level, 1);
    assert_eq!(info.level_name, "Semilla");
    assert_eq!(info.plant_stage, 1);
    assert_eq!(info.progress_percentage, 0);
    assert_eq!(info.next_level_xp, 50);
    assert_eq!(info.xp_for_next_level, 50);
  }

  #[test]
  fn test_exact_threshold() {
    let info = calculate_level(50);
    assert_eq!(info.current_level, 2);
    assert_eq!(info.level_name, "Brote");
    assert_eq!(info.plant_stage, 2);
    assert_eq!(info.progress_percentage, 0);
    assert_eq!(info.xp_for_next_level, 70);
  }

  #[test]
  fn test_progress_rounding() {
    // 20 of 50 toward level 2
    assert_eq!(calculate_level(20).progress_percentage, 40);
    // 35 of 70 toward level 3
    assert_eq!(calculate_level(85).progress_percentage, 50);
    // 1 of 130 = 0.77% rounds up to 1
    assert_eq!(calculate_level(121).progress_percentage, 1);
    // 249: 129 of 130 = 99.2%
    assert_eq!(calculate_level(249).progress_percentage, 99);
  }

  #[test]
  fn test_max_level_saturates() {
    for xp in [1000, 1001, 50_000] {
      let info = calculate_level(xp);
      assert_eq!(info.current_level, 6);
      assert_eq!(info.level_name, "Árbol Sabio");
      assert_eq!(info.progress_percentage, 100);
      assert_eq!(info.xp_for_next_level, 0);
      assert_eq!(info.next_level_xp, xp);
    }
  }

  #[test]
  fn test_negative_xp_resolves_to_first_level() {
    let info = calculate_level(-10);
    assert_eq!(info.current_level, 1);
    assert_eq!(info.progress_percentage, 0);
  }

  #[test]
  fn test_level_is_monotonic_and_bounded() {
    let mut previous = 1;
    for xp in 0..1200 {
      let info = calculate_level(xp);
      assert!(info.current_level >= previous);
      assert!((1..=6).contains(&info.current_level));
      assert!((0..=100).contains(&info.progress_percentage));
      assert_eq!(info.plant_stage, info.current_level);
      previous = info.current_level;
    }
  }
}
