//! Locate the newest patch of a data file
//!
//! Data lives under `<root>/<patch>/<subdir>/<file>`. Every patch directory
//! is searched and the matches are ordered as plain strings, so the "latest"
//! patch is whichever sorts last. Patch names are never parsed as versions:
//! `10.0` sorts before `2.0`.

use crate::core::error::{CoreError, Result};
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};

/// Glob for a single path component
///
/// Supports `*`, `?`, bracket classes (`[abc]`, `[0-9]`, `[!x]`/`[^x]`) and
/// backslash escapes. Like shell globs, nothing but an explicit leading `.`
/// matches a hidden name.
#[derive(Debug, Clone)]
pub struct FilePattern {
    regex: Regex,
    dotted: bool,
}

impl FilePattern {
    pub fn new(glob: &str) -> Result<Self> {
        let chars: Vec<char> = glob.chars().collect();
        let mut source = String::with_capacity(glob.len() + 8);
        source.push('^');

        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                '\\' if i + 1 < chars.len() => {
                    i += 1;
                    push_literal(&mut source, chars[i]);
                }
                '[' => match parse_class(&chars[i..]) {
                    Some((class, consumed)) => {
                        source.push_str(&class);
                        i += consumed;
                        continue;
                    }
                    None => push_literal(&mut source, '['),
                },
                other => push_literal(&mut source, other),
            }
            i += 1;
        }
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| CoreError::Config(format!("invalid file pattern '{}': {}", glob, e)))?;

        Ok(Self {
            regex,
            dotted: glob.starts_with('.'),
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        if name.starts_with('.') && !self.dotted {
            return false;
        }
        self.regex.is_match(name)
    }
}

fn push_literal(source: &mut String, ch: char) {
    source.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4])));
}

/// Translate a bracket class starting at `chars[0] == '['`
///
/// Returns the regex class and how many chars it used, or `None` when the
/// bracket is never closed (it is then matched literally).
fn parse_class(chars: &[char]) -> Option<(String, usize)> {
    let mut end = 1;
    let negated = matches!(chars.get(end), Some('!') | Some('^'));
    if negated {
        end += 1;
    }
    let start = end;
    // A `]` right after the opening bracket is part of the set
    if chars.get(end) == Some(&']') {
        end += 1;
    }
    while chars.get(end)? != &']' {
        end += 1;
    }

    let body = &chars[start..end];
    let mut class = String::from(if negated { "[^" } else { "[" });
    let mut k = 0;
    while k < body.len() {
        if k + 2 < body.len() && body[k + 1] == '-' {
            push_literal(&mut class, body[k]);
            class.push('-');
            push_literal(&mut class, body[k + 2]);
            k += 3;
        } else {
            push_literal(&mut class, body[k]);
            k += 1;
        }
    }
    class.push(']');

    Some((class, end + 1))
}

/// Glob relative to a data directory, one `FilePattern` per component
///
/// `units/hero[0-9].json` descends into `units/` before matching files.
#[derive(Debug, Clone)]
pub struct PathPattern {
    components: Vec<FilePattern>,
}

impl PathPattern {
    pub fn new(glob: &str) -> Result<Self> {
        let components = glob
            .split('/')
            .filter(|component| !component.is_empty())
            .map(FilePattern::new)
            .collect::<Result<Vec<_>>>()?;

        if components.is_empty() {
            return Err(CoreError::Config(format!("empty file pattern '{}'", glob)));
        }
        Ok(Self { components })
    }

    /// Append every path under `dir` that matches, in directory order
    pub fn collect(&self, dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
        walk(dir, &self.components, out)
    }
}

fn walk(dir: &Path, components: &[FilePattern], out: &mut Vec<PathBuf>) -> io::Result<()> {
    let Some((first, rest)) = components.split_first() else {
        return Ok(());
    };

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !first.matches(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        if rest.is_empty() {
            out.push(path);
        } else if path.is_dir() {
            walk(&path, rest, out)?;
        }
    }
    Ok(())
}

/// All files matching `<root>/*/<subdir>/<pattern>`, in string order
///
/// Fails with `DataDirectoryMissing` when `root` is not a directory and with
/// `NoMatchingDataFile` when the root or a patch's data directory cannot be
/// read. Patches without a data directory are skipped. An existing root with
/// no matches yields an empty list.
pub fn resolve_all(root: &Path, subdir: &str, pattern: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CoreError::DataDirectoryMissing {
            root: root.to_path_buf(),
        });
    }

    let path_pattern = PathPattern::new(pattern)?;
    let any_patch = FilePattern::new("*")?;
    let unreadable = |source: io::Error| CoreError::NoMatchingDataFile {
        pattern: pattern.to_string(),
        source,
    };

    let mut matches = Vec::new();
    for patch in std::fs::read_dir(root).map_err(unreadable)? {
        let patch = patch.map_err(unreadable)?;
        if !any_patch.matches(&patch.file_name().to_string_lossy()) {
            continue;
        }

        let data_dir = patch.path().join(subdir);
        if !data_dir.is_dir() {
            continue;
        }
        path_pattern
            .collect(&data_dir, &mut matches)
            .map_err(unreadable)?;
    }

    matches.sort_by(|a, b| {
        a.as_os_str()
            .as_encoded_bytes()
            .cmp(b.as_os_str().as_encoded_bytes())
    });

    tracing::debug!(
        "Resolved {} match(es) for '{}' under {}",
        matches.len(),
        pattern,
        root.display()
    );

    Ok(matches)
}

/// The lexicographically last match, or `None` when nothing matches
pub fn resolve_latest(root: &Path, subdir: &str, pattern: &str) -> Result<Option<PathBuf>> {
    Ok(resolve_all(root, subdir, pattern)?.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, patch: &str, file: &str) -> PathBuf {
        let path = root.join(patch).join("data").join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_pattern_wildcards() {
        let pattern = FilePattern::new("hero*.json").unwrap();
        assert!(pattern.matches("herodata.json"));
        assert!(pattern.matches("hero.json"));
        assert!(!pattern.matches("herodata.json.bak"));
        assert!(!pattern.matches("unitdata.json"));

        let single = FilePattern::new("v?.json").unwrap();
        assert!(single.matches("v1.json"));
        assert!(!single.matches("v10.json"));
    }

    #[test]
    fn test_pattern_escapes_regex_metacharacters() {
        let pattern = FilePattern::new("a+b(1).json").unwrap();
        assert!(pattern.matches("a+b(1).json"));
        assert!(!pattern.matches("aab1.json"));

        let escaped = FilePattern::new(r"what\?.json").unwrap();
        assert!(escaped.matches("what?.json"));
        assert!(!escaped.matches("whatx.json"));
    }

    #[test]
    fn test_pattern_bracket_classes() {
        let digits = FilePattern::new("hero[0-9].json").unwrap();
        assert!(digits.matches("hero1.json"));
        assert!(!digits.matches("heroA.json"));
        assert!(!digits.matches("hero[0-9].json"));

        let set = FilePattern::new("[ab]x.json").unwrap();
        assert!(set.matches("ax.json"));
        assert!(!set.matches("cx.json"));

        let negated = FilePattern::new("[!a]x.json").unwrap();
        assert!(negated.matches("bx.json"));
        assert!(!negated.matches("ax.json"));

        let bracket = FilePattern::new("[]-]x").unwrap();
        assert!(bracket.matches("]x"));
        assert!(bracket.matches("-x"));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        let pattern = FilePattern::new("odd[name.json").unwrap();
        assert!(pattern.matches("odd[name.json"));
    }

    #[test]
    fn test_reversed_range_is_config_error() {
        assert!(matches!(FilePattern::new("[9-0].json"), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_wildcard_skips_hidden_files() {
        let pattern = FilePattern::new("*.json").unwrap();
        assert!(!pattern.matches(".hidden.json"));
        assert!(FilePattern::new(".*.json").unwrap().matches(".hidden.json"));
    }

    #[test]
    fn test_empty_path_pattern_rejected() {
        assert!(matches!(PathPattern::new("/"), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_latest_is_last_in_string_order() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "1.0", "x.json");
        let newest = touch(root.path(), "2.0", "x.json");

        let found = resolve_latest(root.path(), "data", "x.json").unwrap();
        assert_eq!(found, Some(newest));
    }

    #[test]
    fn test_ten_sorts_before_two() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "10.0", "x.json");
        let two = touch(root.path(), "2.0", "x.json");

        let found = resolve_latest(root.path(), "data", "x.json").unwrap();
        assert_eq!(found, Some(two));
    }

    #[test]
    fn test_bracket_class_resolves() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "2.0", "hero1.json");
        let newest = touch(root.path(), "2.0", "hero2.json");
        touch(root.path(), "2.0", "heroX.json");

        let found = resolve_latest(root.path(), "data", "hero[0-9].json").unwrap();
        assert_eq!(found, Some(newest));
    }

    #[test]
    fn test_sub_path_resolves() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "1.0", "units/hero.json");
        let newest = touch(root.path(), "2.0", "units/hero.json");
        touch(root.path(), "2.0", "hero.json");

        let found = resolve_latest(root.path(), "data", "units/hero.json").unwrap();
        assert_eq!(found, Some(newest));

        let any_dir = resolve_all(root.path(), "data", "*/hero.json").unwrap();
        assert_eq!(any_dir.len(), 2);
    }

    #[test]
    fn test_missing_root_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("absent");

        let result = resolve_latest(&missing, "data", "x.json");
        assert!(matches!(result, Err(CoreError::DataDirectoryMissing { .. })));
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "1.0", "other.json");

        let found = resolve_latest(root.path(), "data", "x.json").unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_patches_without_data_dir_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("3.0")).unwrap();
        fs::create_dir_all(root.path().join("4.0")).unwrap();
        fs::write(root.path().join("4.0").join("data"), "a file, not a dir").unwrap();
        fs::write(root.path().join("README"), "not a patch").unwrap();
        let only = touch(root.path(), "1.0", "x.json");

        let all = resolve_all(root.path(), "data", "*.json").unwrap();
        assert_eq!(all, vec![only]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_data_dir_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "1.0", "x.json");
        touch(root.path(), "2.0", "x.json");
        let locked = root.path().join("2.0").join("data");

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let bypassed = fs::read_dir(&locked).is_ok();
        let result = resolve_latest(root.path(), "data", "x.json");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users read through the mode bits
        if bypassed {
            assert!(result.is_ok());
            return;
        }
        match result {
            Err(CoreError::NoMatchingDataFile { pattern, .. }) => assert_eq!(pattern, "x.json"),
            other => panic!("expected NoMatchingDataFile, got {:?}", other),
        }
    }
}
