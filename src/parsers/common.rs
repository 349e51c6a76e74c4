//! Small helpers shared by every format parser.

/// Split on `delimiter`, trimming each piece and dropping empties.
/// Grounded on `original_source/builders/wos.py::_delimited`.
pub fn delimited(value: &str, delimiter: &str) -> Vec<String> {
    value
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A 4-digit year token, the only kind this toolkit accepts as a
/// publication year.
pub fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}
