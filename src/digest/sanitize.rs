//! Message filtering and table-cell normalization.

use crate::platform::Message;

/// Column separator of the rendered table.
pub const DELIMITER: char = '|';
/// Stand-in for the separator inside cell text.
pub const DELIMITER_SUBSTITUTE: char = '｜';
/// Rendered in place of empty or whitespace-only content.
pub const EMPTY_PLACEHOLDER: &str = "(no text / attachment only)";
const ELLIPSIS: &str = "...";

/// Messages from automated authors never reach a report.
pub fn is_reportable(msg: &Message) -> bool {
    !msg.is_automated
}

/// Collapse line breaks and replace the table delimiter.
/// `\r\n`, `\n` and `\r` each become a single space.
pub fn escape_cell(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => out.push(' '),
            DELIMITER => out.push(DELIMITER_SUBSTITUTE),
            other => out.push(other),
        }
    }
    out
}

/// Normalize message text into a single-line cell of at most `cap` code points.
pub fn sanitize_content(raw: &str, cap: usize) -> String {
    if raw.trim().is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    let cell = escape_cell(raw);
    if cell.chars().count() <= cap {
        return cell;
    }
    let keep = cap.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = cell.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
