//! Field sanitization for rendered paths

/// Sanitize one substituted field value for filesystem use.
///
/// Replaces `/ ? < > \ : * | "` with `_` and trims surrounding
/// whitespace. On Windows a trailing dot is also unsafe and is replaced
/// before the character pass. Template literal text never goes through
/// here; only looked-up metadata values do.
pub fn sanitize_component(input: &str) -> String {
    const UNSAFE: [char; 9] = ['/', '?', '<', '>', '\\', ':', '*', '|', '"'];

    let input = if cfg!(windows) && input.ends_with('.') {
        format!("{}_", &input[..input.len() - 1])
    } else {
        input.to_string()
    };

    input
        .chars()
        .map(|c| if UNSAFE.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}
