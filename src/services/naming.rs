use std::collections::HashSet;

/// Produces a display name not present in `existing` by probing `base`,
/// `base (1)`, `base (2)`, ... with the original extension re-appended.
/// The split happens on the last dot, so `archive.tar.gz` keeps
/// `archive.tar` as its base. Returns the input unchanged when it is
/// already unique.
pub fn resolve_unique_name(candidate: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(candidate) {
        return candidate.to_string();
    }

    let (base, ext) = match candidate.rsplit_once('.') {
        Some((base, ext)) => (base, format!(".{}", ext)),
        None => (candidate, String::new()),
    };

    let mut count = 1;
    loop {
        let next = format!("{} ({}){}", base, count, ext);
        if !existing.contains(&next) {
            return next;
        }
        count += 1;
    }
}
