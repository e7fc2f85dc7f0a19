//! Scoring module - placement scores, leveling and gravity

use crate::types::{DROP_INTERVALS, DROP_INTERVAL_MIN_MS, LINE_SCORES};

/// Calculate the score for one placement
/// lines: number of rows removed by the placement (line-clear items included)
/// level: current level (1-based)
///
/// Clears of more than four rows score as four.
pub fn calculate_line_score(lines: usize, level: u32, double_score: bool) -> u32 {
    let base = LINE_SCORES[lines.min(4)].saturating_mul(level);
    if double_score {
        base.saturating_mul(2)
    } else {
        base
    }
}

/// Level for a total line count: `lines / lines_per_level + 1`
pub fn level_for_lines(lines: u32, lines_per_level: u32) -> u32 {
    lines / lines_per_level.max(1) + 1
}

/// Gravity interval for a level (1-based)
pub fn get_drop_interval_ms(level: u32) -> u32 {
    let idx = level.saturating_sub(1) as usize;
    DROP_INTERVALS
        .get(idx)
        .copied()
        .unwrap_or(DROP_INTERVAL_MIN_MS)
        .max(DROP_INTERVAL_MIN_MS)
}
