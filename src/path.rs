//! Name normalisation and prefix utilities.

use alloc::string::String;

/// Uses '/' as the only separator.
pub fn normalize(name: &str) -> String {
    name.replace('\\', "/")
}

/// Splits `file:stream` into the base name and the stream name, if any.
pub fn split_stream(name: &str) -> (&str, Option<&str>) {
    match name.split_once(':') {
        Some((base, stream)) if !base.is_empty() => (base, Some(stream)),
        _ => (name, None),
    }
}

/// Parent directory of a path, "/" for top-level names.
pub fn parent(name: &str) -> &str {
    match name.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &name[..pos],
    }
}

/// If `name` is `dir` itself or lies under it (`dir/...` or `dir:stream`), returns the
/// part after `dir`.
pub fn strip_dir<'a>(name: &'a str, dir: &str) -> Option<&'a str> {
    let head = name.get(..dir.len())?;
    if !head.eq_ignore_ascii_case(dir) {
        return None;
    }
    let rest = &name[dir.len()..];
    if rest.is_empty() || rest.starts_with('/') || rest.starts_with(':') {
        Some(rest)
    } else {
        None
    }
}
