//! Multi-file import resolution (spec.md §4.F), applying the six
//! normalization rules in order and tracking a per-compile visited set to
//! catch circular imports.

use std::collections::{BTreeMap, HashSet};

use crate::error::VerifyError;

pub struct ImportResolver {
    files: BTreeMap<String, String>,
}

impl ImportResolver {
    pub fn new(files: BTreeMap<String, String>) -> Self {
        ImportResolver { files }
    }

    /// Resolves `path` (as written in an `import` statement) to the
    /// matching source file's content, applying the rules in order and
    /// stopping at the first match.
    pub fn resolve(&self, path: &str) -> Result<(&str, &str), VerifyError> {
        self.candidates(path)
            .into_iter()
            .find_map(|candidate| {
                self.files
                    .get_key_value(&candidate)
                    .map(|(k, v)| (k.as_str(), v.as_str()))
            })
            .ok_or_else(|| VerifyError::ImportNotFound(path.to_string()))
    }

    /// Resolves `path` while tracking `visited` to detect import cycles;
    /// `importer` is the file doing the importing, recorded for the error
    /// message.
    pub fn resolve_tracked<'a>(
        &'a self,
        importer: &str,
        path: &str,
        visited: &mut HashSet<String>,
    ) -> Result<(&'a str, &'a str), VerifyError> {
        let (resolved_path, content) = self.resolve(path)?;
        if !visited.insert(resolved_path.to_string()) {
            return Err(VerifyError::CircularImport(format!(
                "{importer} -> {resolved_path}"
            )));
        }
        Ok((resolved_path, content))
    }

    fn candidates(&self, path: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |candidate: String, seen: &mut HashSet<String>, out: &mut Vec<String>| {
            if seen.insert(candidate.clone()) {
                out.push(candidate);
            }
        };

        // 1. exact match
        push(path.to_string(), &mut seen, &mut out);

        // 2. leading "./" or "../" stripped
        let stripped = path.trim_start_matches("./").trim_start_matches("../");
        push(stripped.to_string(), &mut seen, &mut out);

        // 3. .sol suffix added/removed
        for base in [path, stripped] {
            if let Some(without) = base.strip_suffix(".sol") {
                push(without.to_string(), &mut seen, &mut out);
            } else {
                push(format!("{base}.sol"), &mut seen, &mut out);
            }
        }

        // 4. separator swap
        for base in out.clone() {
            push(base.replace('\\', "/"), &mut seen, &mut out);
            push(base.replace('/', "\\"), &mut seen, &mut out);
        }

        // 5. lowercased
        for base in out.clone() {
            push(base.to_lowercase(), &mut seen, &mut out);
        }

        // 6. basename lookup
        if let Some(basename) = path.rsplit(['/', '\\']).next() {
            push(basename.to_string(), &mut seen, &mut out);
            if let Some(without) = basename.strip_suffix(".sol") {
                push(without.to_string(), &mut seen, &mut out);
            } else {
                push(format!("{basename}.sol"), &mut seen, &mut out);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ImportResolver {
        let mut files = BTreeMap::new();
        files.insert("contracts/Token.sol".to_string(), "contract Token {}".to_string());
        files.insert("IERC20".to_string(), "interface IERC20 {}".to_string());
        ImportResolver::new(files)
    }

    #[test]
    fn resolves_exact_match() {
        let r = resolver();
        assert_eq!(r.resolve("contracts/Token.sol").unwrap().1, "contract Token {}");
    }

    #[test]
    fn strips_leading_relative_prefix() {
        let r = resolver();
        assert_eq!(r.resolve("./contracts/Token.sol").unwrap().1, "contract Token {}");
    }

    #[test]
    fn adds_missing_sol_suffix() {
        let r = resolver();
        assert_eq!(r.resolve("IERC20.sol").unwrap().1, "interface IERC20 {}");
        assert_eq!(r.resolve("IERC20").unwrap().1, "interface IERC20 {}");
    }

    #[test]
    fn falls_back_to_basename() {
        let r = resolver();
        assert_eq!(r.resolve("../../libs/Token.sol").unwrap().1, "contract Token {}");
    }

    #[test]
    fn unresolvable_import_errors() {
        let r = resolver();
        assert!(r.resolve("DoesNotExist.sol").is_err());
    }

    #[test]
    fn revisiting_the_same_file_is_circular() {
        let r = resolver();
        let mut visited = HashSet::new();
        r.resolve_tracked("Main.sol", "contracts/Token.sol", &mut visited).unwrap();
        let err = r.resolve_tracked("Other.sol", "contracts/Token.sol", &mut visited);
        assert!(matches!(err, Err(VerifyError::CircularImport(_))));
    }
}
