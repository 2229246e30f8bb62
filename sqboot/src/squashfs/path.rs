//! Pure path arithmetic: tokenisation, dir/basename splitting, and symlink
//! target resolution. No filesystem access happens here, so everything is
//! unit-testable without an image.

use super::error::{Result, SqfsError};

/// Symlink traversals allowed while resolving one path. A chain longer than
/// this reports [`SqfsError::LoopDetected`].
pub(crate) const MAX_SYMLINK_DEPTH: u32 = 40;

/// Split a path into slash-separated components. Leading and trailing
/// slashes and empty components are dropped; `.` and `..` survive as
/// ordinary tokens for the walker to interpret positionally.
pub(crate) fn tokenize(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Split a path into its directory part and final component. Paths are
/// always interpreted as absolute; a trailing slash is ignored.
pub(crate) fn split(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    match trimmed.rfind('/') {
        Some(i) => (format!("/{}", &trimmed[..i]), trimmed[i + 1..].to_owned()),
        None => ("/".to_owned(), trimmed.to_owned()),
    }
}

/// Resolve a symlink target against the directory the link lives in,
/// given as already-resolved path components. Returns the absolute token
/// list of the target.
///
/// `..` and `.` inside the target apply positionally, POSIX style; `..` at
/// the root stays at the root. An empty target never resolves.
pub(crate) fn resolve_link(parent: &[String], target: &str) -> Result<Vec<String>> {
    if target.is_empty() {
        return Err(SqfsError::InvalidArgument("empty symlink target"));
    }
    let mut out: Vec<String> = if target.starts_with('/') {
        Vec::new()
    } else {
        parent.to_vec()
    };
    for tok in target.split('/').filter(|c| !c.is_empty()) {
        match tok {
            "." => {}
            ".." => {
                out.pop();
            }
            _ => out.push(tok.to_owned()),
        }
    }
    Ok(out)
}

/// Join absolute path tokens back into a path string.
pub(crate) fn join_absolute(tokens: &[String]) -> String {
    if tokens.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}", tokens.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenize_strips_slashes() {
        assert_eq!(tokenize("/a/b/c"), toks(&["a", "b", "c"]));
        assert_eq!(tokenize("a/b/"), toks(&["a", "b"]));
        assert_eq!(tokenize("//a//b"), toks(&["a", "b"]));
        assert!(tokenize("/").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn split_dir_and_base() {
        assert_eq!(split("/a/b.txt"), ("/a".into(), "b.txt".into()));
        assert_eq!(split("/a/b/c"), ("/a/b".into(), "c".into()));
        assert_eq!(split("/top"), ("/".into(), "top".into()));
        assert_eq!(split("top"), ("/".into(), "top".into()));
        assert_eq!(split("/a/b/"), ("/a".into(), "b".into()));
        assert_eq!(split("/"), ("/".into(), "".into()));
    }

    #[test]
    fn relative_target_resolves_in_place() {
        let parent = toks(&["usr", "bin"]);
        assert_eq!(resolve_link(&parent, "gzip").unwrap(), toks(&["usr", "bin", "gzip"]));
    }

    #[test]
    fn absolute_target_restarts_at_root() {
        let parent = toks(&["usr", "bin"]);
        assert_eq!(resolve_link(&parent, "/sbin/init").unwrap(), toks(&["sbin", "init"]));
    }

    #[test]
    fn updirs_apply_positionally() {
        let parent = toks(&["a", "b"]);
        assert_eq!(resolve_link(&parent, "../c").unwrap(), toks(&["a", "c"]));
        // An interior `..` must not be hoisted to the front: `x/../y`
        // resolves to `y` within the parent, not outside it.
        assert_eq!(resolve_link(&parent, "x/../y").unwrap(), toks(&["a", "b", "y"]));
        assert_eq!(resolve_link(&parent, "../../../z").unwrap(), toks(&["z"]));
    }

    #[test]
    fn dot_components_are_dropped() {
        let parent = toks(&["a"]);
        assert_eq!(resolve_link(&parent, "./b/./c").unwrap(), toks(&["a", "b", "c"]));
    }

    #[test]
    fn updir_at_root_stays_at_root() {
        assert_eq!(resolve_link(&[], "../x").unwrap(), toks(&["x"]));
    }

    #[test]
    fn empty_target_is_an_error() {
        assert!(resolve_link(&[], "").is_err());
    }

    #[test]
    fn join_absolute_round_trips() {
        assert_eq!(join_absolute(&toks(&["a", "b"])), "/a/b");
        assert_eq!(join_absolute(&[]), "/");
    }
}
