//! Game version downgrade steps for `--allow-version-fallback`.

/// Next game version to try after `version` yielded nothing.
///
/// Steps the patch component down (`1.20.2 -> 1.20.1`), collapsing a zero patch into
/// the two-component form (`1.20.1 -> 1.20`). Returns `None` when there is no patch
/// component to decrement, so a fallback loop always terminates.
#[must_use]
pub fn next_version_down(version: &str) -> Option<String> {
    let mut parts = version.split('.');
    let major = parts.next()?;
    let minor = parts.next()?;
    let patch: u32 = parts.next()?.parse().ok()?;

    if parts.next().is_some() || patch == 0 {
        return None;
    }

    match patch - 1 {
        0 => Some(format!("{major}.{minor}")),
        next => Some(format!("{major}.{minor}.{next}")),
    }
}
