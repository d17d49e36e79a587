//! Default EVM version by compiler range (spec.md §4.F table), used when
//! the caller omits `evmVersion`.

/// Parses the `X.Y.Z` prefix of a compiler version string like
/// `0.8.20+commit.a1b79de6`.
fn parse_major_minor_patch(compiler_version: &str) -> Option<(u32, u32, u32)> {
    let core = compiler_version.split('+').next()?;
    let mut parts = core.trim_start_matches('v').split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    let patch: u32 = parts.next()?.parse().ok()?;
    Some((major, minor, patch))
}

/// Defaults per spec.md §4.F; versions `>= 0.8.10` have no table entry —
/// callers are expected to supply `evmVersion` explicitly, so this falls
/// back to the latest table entry as "otherwise latest supported".
pub fn default_evm_version(compiler_version: &str) -> &'static str {
    match parse_major_minor_patch(compiler_version) {
        Some((0, 4, _)) => "byzantium",
        Some((0, 5, _)) => "petersburg",
        Some((0, 6, _)) => "istanbul",
        Some((0, 7, _)) => "berlin",
        Some((0, 8, 0)) => "istanbul",
        Some((0, 8, p)) if (1..=5).contains(&p) => "berlin",
        Some((0, 8, p)) if (6..=9).contains(&p) => "london",
        _ => "shanghai",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_table_row() {
        assert_eq!(default_evm_version("0.4.26"), "byzantium");
        assert_eq!(default_evm_version("0.5.17"), "petersburg");
        assert_eq!(default_evm_version("0.6.12"), "istanbul");
        assert_eq!(default_evm_version("0.7.6"), "berlin");
        assert_eq!(default_evm_version("0.8.0"), "istanbul");
        assert_eq!(default_evm_version("0.8.5"), "berlin");
        assert_eq!(default_evm_version("0.8.9+commit.e5eed63a"), "london");
        assert_eq!(default_evm_version("0.8.20+commit.a1b79de6"), "shanghai");
    }
}
