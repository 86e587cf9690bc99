/// Longest file name most filesystems accept, in bytes.
const MAX_FILE_NAME_BYTES: usize = 255;

/// Map a probed name (plus optional suffix) to a single safe path component.
///
/// Path separators, control characters and characters Windows rejects become
/// `_`. A name that would resolve to `.` or `..` is prefixed with `_`.
#[must_use]
pub fn safe_file_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    if out.is_empty() || out.chars().all(|c| c == '.') {
        out.insert(0, '_');
    }

    if out.len() > MAX_FILE_NAME_BYTES {
        let mut end = MAX_FILE_NAME_BYTES;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
    }
    out
}
