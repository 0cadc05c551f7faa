//! Truncation for captured tool output.
//!
//! Tool stdout/stderr ends up inside the persisted execution state; without
//! a cap, one chatty tool bloats every subsequent snapshot.

/// How to truncate output that exceeds the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationMode {
    /// Keep the head and the tail, with a marker in the middle.
    HeadTail,
    /// Keep only the tail, with a marker at the start.
    Tail,
}

/// Truncate `output` to roughly `max_chars` bytes using the given mode.
///
/// Output within the limit is returned unchanged. Cut points are nudged back
/// to UTF-8 character boundaries, so the result may be slightly shorter than
/// the limit.
pub fn truncate_output(output: &str, max_chars: usize, mode: TruncationMode) -> String {
    if output.len() <= max_chars {
        return output.to_string();
    }

    match mode {
        TruncationMode::HeadTail => {
            let head_end = floor_boundary(output, max_chars / 2);
            let tail_start = floor_boundary(output, output.len() - (max_chars - max_chars / 2));
            let removed = tail_start - head_end;
            format!(
                "{}\n[... {} bytes truncated ...]\n{}",
                &output[..head_end],
                removed,
                &output[tail_start..]
            )
        }
        TruncationMode::Tail => {
            let tail_start = floor_boundary(output, output.len() - max_chars);
            let removed = tail_start;
            format!(
                "[... {} bytes truncated ...]\n{}",
                removed,
                &output[tail_start..]
            )
        }
    }
}

/// Largest char boundary at or below `index`.
fn floor_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
