//! INFO reply parsing.

/// Returns the value of `field` from INFO output: the text after `field:`
/// (or `field=` for the `dbN:keys=...` lines) up to the line end or the next
/// comma, whichever comes first.
pub fn info_field<'a>(info: &'a str, field: &str) -> Option<&'a str> {
    let mut from = 0;
    loop {
        let pos = from + info[from..].find(field)?;
        let rest = &info[pos + field.len()..];
        let at_line_start = pos == 0 || info.as_bytes()[pos - 1] == b'\n';

        // Anything else is part of a longer name, e.g. `used_memory_human`
        // or `rdb_bgsave_in_progress`.
        if at_line_start && matches!(rest.as_bytes().first(), Some(b':') | Some(b'=')) {
            let value = &rest[1..];
            let end = value
                .find(|c| c == '\r' || c == '\n' || c == ',')
                .unwrap_or(value.len());
            return Some(&value[..end]);
        }
        from = pos + field.len();
    }
}

/// Like `info_field`, parsed as an integer. `None` when missing or malformed.
pub fn info_long(info: &str, field: &str) -> Option<i64> {
    info_field(info, field)?.trim().parse().ok()
}
