//! Line pagination utilities

use std::collections::VecDeque;

/// Paginate lines based on offset and length
///
/// - offset >= 0: start from line N, take `length` lines
/// - offset < 0: tail mode, take the last |offset| lines
pub(super) fn paginate_lines(lines: &VecDeque<String>, offset: i64, length: usize) -> Vec<String> {
    match usize::try_from(offset) {
        Ok(start) => lines.iter().skip(start).take(length).cloned().collect(),
        Err(_) => {
            let tail_count = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX);
            let skip = lines.len().saturating_sub(tail_count);
            lines.iter().skip(skip).cloned().collect()
        }
    }
}

/// Whether lines exist beyond the current page
///
/// Tail queries always end at the newest line, so they never have more.
pub(super) fn calculate_has_more(offset: i64, lines_returned: usize, total_lines: usize) -> bool {
    match usize::try_from(offset) {
        Ok(start) => start.saturating_add(lines_returned) < total_lines,
        Err(_) => false,
    }
}

/// Last `count` lines, oldest first
pub(super) fn last_lines(lines: &VecDeque<String>, count: usize) -> Vec<String> {
    let skip = lines.len().saturating_sub(count);
    lines.iter().skip(skip).cloned().collect()
}
