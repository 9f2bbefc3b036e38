//! Leveling curve.
//!
//! Cumulative thresholds: level L needs `xp_per_level * (L-1) * L / 2`
//! total experience. With the default 100 that is level 2 at 100 XP,
//! level 3 at 300, level 4 at 600. The curve is strictly increasing, so the
//! level for any experience total is unique and independent of how the
//! experience was granted.

use crate::config::LevelingConfig;

/// Calculate total XP required to reach a level
pub fn total_xp_for_level(level: i32, xp_per_level: i64) -> i64 {
    if level <= 1 {
        return 0;
    }
    let l = level as i64;
    xp_per_level.saturating_mul((l - 1) * l / 2)
}

/// Calculate level from total XP (inverse of total_xp_for_level)
pub fn level_for_xp(xp: i64, config: &LevelingConfig) -> i32 {
    // Binary search for efficiency
    let mut low = 1;
    let mut high = config.max_level.max(1);

    while low < high {
        let mid = (low + high + 1) / 2;
        if total_xp_for_level(mid, config.xp_per_level) <= xp {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

/// XP still needed from `xp` to the level after `level` (0 at max level)
pub fn xp_to_next_level(level: i32, xp: i64, config: &LevelingConfig) -> i64 {
    if level >= config.max_level {
        return 0;
    }
    (total_xp_for_level(level + 1, config.xp_per_level) - xp).max(0)
}

/// XP progress within current level (0.0 to 1.0)
pub fn level_progress(level: i32, xp: i64, config: &LevelingConfig) -> f32 {
    if level >= config.max_level {
        return 1.0;
    }
    let current_level_xp = total_xp_for_level(level, config.xp_per_level);
    let next_level_xp = total_xp_for_level(level + 1, config.xp_per_level);
    let xp_in_level = xp - current_level_xp;
    let xp_needed = next_level_xp - current_level_xp;
    (xp_in_level as f32 / xp_needed as f32).clamp(0.0, 1.0)
}
