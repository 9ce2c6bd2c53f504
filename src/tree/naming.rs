//! Sibling file-name disambiguation

/// Split a file name at its first `.` into stem and extension.
///
/// `app.test.ts` splits into `app` and `test.ts`; a name without a dot has no
/// extension.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}

/// Name for the `n`-th duplicate: `app.ts` becomes `app(n).ts`
pub fn numbered(name: &str, n: usize) -> String {
    match split_name(name) {
        (stem, Some(ext)) => format!("{}({}).{}", stem, n, ext),
        (stem, None) => format!("{}({})", stem, n),
    }
}

/// First name in the sequence `name`, `name(1)`, `name(2)`, ... for which
/// `taken` is false.
pub fn disambiguate<F>(name: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !taken(name) {
        return name.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = numbered(name, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
