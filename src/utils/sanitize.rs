//! Filename helpers

/// Characters that are not allowed in file names on at least one platform
const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace each run of reserved characters with a single `_`.
///
/// Returns `"video"` when nothing printable is left.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;

    for ch in name.chars() {
        if RESERVED.contains(&ch) {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}
