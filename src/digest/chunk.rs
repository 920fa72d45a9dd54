//! Line-boundary splitting of rendered text into post-sized chunks.

/// Split `text` into chunks of at most `max_len` code points, cutting only
/// between lines. Joining the chunks with `\n` reproduces `text`.
///
/// A single line longer than `max_len` becomes its own oversized chunk.
pub fn split_lines(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };
        if needed > max_len && !current.is_empty() {
            chunks.push(current.join("\n"));
            current.clear();
            current_len = 0;
        }
        current_len = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };
        current.push(line);
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    for chunk in &chunks {
        let len = chunk.chars().count();
        if len > max_len {
            tracing::warn!(
                "Chunk of {} chars exceeds limit {} (single overlong line)",
                len,
                max_len
            );
        }
    }
    chunks
}
