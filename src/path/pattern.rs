//! Wildcard pattern engine (spec.md §4.F): single-component matching with
//! `?`, `*`, `[...]`; multi-component matching with `**` (recursive) and
//! `***` (self-matching recursive); and `path_search`, which drives the
//! matcher against a real directory tree.

use super::{DirPath, Path as FPath, Platform};
use crate::error::{Error, Result};
use std::path::Path as StdPath;

/// Match a single path component (no separators) against a pattern that may
/// contain `?`, `*`, and bracket expressions. Mirrors the reference
/// suffix/prefix two-pointer algorithm (`original_source/libbutl/path-pattern.cxx`):
/// match the pattern suffix after the last unescaped `*` against the name's
/// trailing characters, then recurse/backtrack on the remainder.
pub fn match_component(name: &str, pattern: &str, case_sensitive: bool) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    match_chars(&name, &pattern, case_sensitive)
}

fn chars_eq(a: char, b: char, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.to_ascii_lowercase() == b.to_ascii_lowercase()
    }
}

/// Parse a bracket expression starting at `pattern[i] == '['`. Returns
/// `(matches, next_index)` where `next_index` is just past the closing `]`.
fn match_bracket(c: char, pattern: &[char], i: usize, case_sensitive: bool) -> (bool, usize) {
    debug_assert_eq!(pattern[i], '[');
    let mut j = i + 1;
    let negate = j < pattern.len() && pattern[j] == '!';
    if negate {
        j += 1;
    }
    let start = j;
    let mut matched = false;
    // A `]` right after `[` or `[!` is a literal member, not a terminator.
    let mut k = j;
    loop {
        if k >= pattern.len() {
            // Unterminated bracket: treat '[' as a literal.
            return (chars_eq(c, '[', case_sensitive), i + 1);
        }
        if pattern[k] == ']' && k != start {
            break;
        }
        k += 1;
    }
    let end = k; // index of closing ']'
    let mut p = start;
    while p < end {
        if pattern[p] == '-' && p != start && p + 1 < end {
            let lo = pattern[p - 1];
            let hi = pattern[p + 1];
            if case_sensitive {
                if c >= lo && c <= hi {
                    matched = true;
                }
            } else {
                let cl = c.to_ascii_lowercase();
                let mut b = lo;
                loop {
                    if chars_eq(cl, b, false) {
                        matched = true;
                        break;
                    }
                    if b == hi {
                        break;
                    }
                    b = ((b as u32) + 1) as u8 as char;
                }
            }
            p += 1;
        } else {
            if chars_eq(c, pattern[p], case_sensitive) {
                matched = true;
            }
            p += 1;
        }
    }
    (matched != negate, end + 1)
}

fn match_chars(name: &[char], pattern: &[char], case_sensitive: bool) -> bool {
    match_from(name, 0, pattern, 0, case_sensitive)
}

fn match_from(name: &[char], mut ni: usize, pattern: &[char], mut pi: usize, case_sensitive: bool) -> bool {
    while pi < pattern.len() {
        match pattern[pi] {
            '*' => {
                // Tail-anchoring: try every split point, recursing.
                // Collapse consecutive '*' first.
                while pi < pattern.len() && pattern[pi] == '*' {
                    pi += 1;
                }
                if pi == pattern.len() {
                    return true;
                }
                for split in ni..=name.len() {
                    if match_from(name, split, pattern, pi, case_sensitive) {
                        return true;
                    }
                }
                return false;
            }
            '?' => {
                if ni >= name.len() {
                    return false;
                }
                ni += 1;
                pi += 1;
            }
            '[' => {
                if ni >= name.len() {
                    return false;
                }
                let (m, next_pi) = match_bracket(name[ni], pattern, pi, case_sensitive);
                if !m {
                    return false;
                }
                ni += 1;
                pi = next_pi;
            }
            c => {
                if ni >= name.len() || !chars_eq(name[ni], c, case_sensitive) {
                    return false;
                }
                ni += 1;
                pi += 1;
            }
        }
    }
    ni == name.len()
}

fn is_recursive_component(c: &str) -> bool {
    c == "**"
}

fn is_self_matching_component(c: &str) -> bool {
    c == "***"
}

/// Multi-component match (spec.md §4.F `path_match`): split both sides on
/// separators and match component-by-component, with `**`/`***` consuming
/// zero or more intermediate levels.
pub fn path_match(candidate: &FPath, pattern: &FPath, match_absent: bool) -> bool {
    let platform = pattern.platform();
    let cand: Vec<&str> = candidate.components().collect();
    let pat: Vec<&str> = pattern.components().collect();
    match_components(&cand, &pat, platform.case_sensitive(), match_absent)
}

fn match_components(cand: &[&str], pat: &[&str], case_sensitive: bool, match_absent: bool) -> bool {
    if pat.is_empty() {
        return cand.is_empty();
    }

    let (head, tail) = (pat[0], &pat[1..]);

    if is_recursive_component(head) || is_self_matching_component(head) {
        if is_self_matching_component(head) && match_components(cand, tail, case_sensitive, match_absent) {
            return true;
        }
        for split in 0..=cand.len() {
            if match_components(&cand[split..], tail, case_sensitive, match_absent) {
                return true;
            }
        }
        return false;
    }

    if cand.is_empty() {
        // match_absent allows a wildcard-only component to stand for a
        // missing level.
        return match_absent && is_wildcard_only(head) && match_components(cand, tail, case_sensitive, match_absent);
    }

    // Dot-started names require a dot-started pattern component, unless the
    // pattern component is a literal that happens to start with '.' already
    // (handled naturally since match_component compares literally).
    if cand[0].starts_with('.') && !head.starts_with('.') && head.contains(['*', '?', '[']) {
        return false;
    }

    if !match_component(cand[0], head, case_sensitive) {
        return false;
    }

    match_components(&cand[1..], tail, case_sensitive, match_absent)
}

fn is_wildcard_only(c: &str) -> bool {
    !c.is_empty() && c.chars().all(|ch| ch == '*')
}

/// How dangling symlinks are handled during [`path_search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanglingPolicy {
    Fail,
    Ignore,
    Report,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub follow_symlinks: bool,
    pub match_absent: bool,
    pub dangling: DanglingPolicy,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            follow_symlinks: true,
            match_absent: false,
            dangling: DanglingPolicy::Fail,
        }
    }
}

/// Drive the matcher against a real directory tree rooted at `start`
/// (spec.md §4.F `path_search`). `callback` is invoked once per matching
/// path (relative to `start`); returning `false` stops the search early.
pub fn path_search(
    start: &DirPath,
    pattern: &FPath,
    options: &SearchOptions,
    mut callback: impl FnMut(&FPath) -> bool,
) -> Result<()> {
    let platform = pattern.platform();
    let components: Vec<&str> = pattern.components().collect();
    let mut seen = std::collections::HashSet::new();
    let mut acc: Vec<String> = Vec::new();
    let stop = search_rec(
        StdPath::new(start.as_str()),
        &components,
        platform,
        options,
        &mut acc,
        &mut seen,
        &mut callback,
    )?;
    let _ = stop;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn search_rec(
    dir: &StdPath,
    pattern: &[&str],
    platform: Platform,
    options: &SearchOptions,
    acc: &mut Vec<String>,
    seen: &mut std::collections::HashSet<String>,
    callback: &mut dyn FnMut(&FPath) -> bool,
) -> Result<bool> {
    if pattern.is_empty() {
        let rel = acc.join(&platform.preferred_separator().to_string());
        if seen.insert(rel.clone()) {
            let p = FPath::new(rel, platform)?;
            if !callback(&p) {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    let head = pattern[0];
    let tail = &pattern[1..];

    if is_recursive_component(head) || is_self_matching_component(head) {
        if is_self_matching_component(head) && !search_rec(dir, tail, platform, options, acc, seen, callback)? {
            return Ok(false);
        }
        return search_recursive_levels(dir, tail, platform, options, acc, seen, callback);
    }

    if !has_wildcard(head) {
        let child = dir.join(head);
        if entry_exists(&child, options)? {
            acc.push(head.to_string());
            let cont = search_rec(&child, tail, platform, options, acc, seen, callback)?;
            acc.pop();
            return Ok(cont);
        }
        return Ok(true);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(Error::os_error(e)),
    };
    for entry in entries {
        let entry = entry.map_err(Error::os_error)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') && !head.starts_with('.') {
            continue;
        }
        if !match_component(&name, head, platform.case_sensitive()) {
            continue;
        }
        let child = dir.join(&*name);
        if !dangling_ok(&child, options)? {
            continue;
        }
        acc.push(name.into_owned());
        let cont = search_rec(&child, tail, platform, options, acc, seen, callback)?;
        acc.pop();
        if !cont {
            return Ok(false);
        }
    }
    Ok(true)
}

fn has_wildcard(s: &str) -> bool {
    s.chars().any(|c| c == '*' || c == '?' || c == '[')
}

fn entry_exists(path: &StdPath, options: &SearchOptions) -> Result<bool> {
    let meta = if options.follow_symlinks {
        std::fs::metadata(path)
    } else {
        std::fs::symlink_metadata(path)
    };
    match meta {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::os_error(e)),
    }
}

fn dangling_ok(path: &StdPath, options: &SearchOptions) -> Result<bool> {
    let link_meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) => return Err(Error::os_error(e)),
    };
    if !link_meta.file_type().is_symlink() {
        return Ok(true);
    }
    match std::fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(_) => match options.dangling {
            DanglingPolicy::Fail => Err(Error::invalid_argument(format!(
                "dangling symlink: {}",
                path.display()
            ))),
            DanglingPolicy::Ignore => Ok(false),
            DanglingPolicy::Report => Ok(true),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn search_recursive_levels(
    dir: &StdPath,
    tail: &[&str],
    platform: Platform,
    options: &SearchOptions,
    acc: &mut Vec<String>,
    seen: &mut std::collections::HashSet<String>,
    callback: &mut dyn FnMut(&FPath) -> bool,
) -> Result<bool> {
    // Zero intermediate levels: match tail right here.
    if !search_rec(dir, tail, platform, options, acc, seen, callback)? {
        return Ok(false);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(_) => return Ok(true),
    };
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let child = dir.join(&*name);
        let is_dir = if options.follow_symlinks {
            std::fs::metadata(&child).map(|m| m.is_dir()).unwrap_or(false)
        } else {
            entry.file_type().map(|t| t.is_dir() && !t.is_symlink()).unwrap_or(false)
        };
        if !is_dir {
            continue;
        }
        acc.push(name.into_owned());
        let cont = search_recursive_levels(&child, tail, platform, options, acc, seen, callback)?;
        acc.pop();
        if !cont {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::DirPath;

    #[test]
    fn star_and_question_and_bracket() {
        assert!(match_component("file.txt", "*.txt", true));
        assert!(match_component("a1b", "a?b", true));
        assert!(match_component("cat", "[cb]at", true));
        assert!(!match_component("hat", "[cb]at", true));
        assert!(match_component("hat", "[!cb]at", true));
    }

    #[test]
    fn bracket_range() {
        assert!(match_component("5", "[0-9]", true));
        assert!(!match_component("a", "[0-9]", true));
    }

    #[test]
    fn windows_case_insensitive_component() {
        assert!(match_component("FILE.TXT", "file.*", false));
    }

    #[test]
    fn recursive_wildcard_matches_multiple_levels() {
        let pat = FPath::new("a/**/c.txt", Platform::Posix).unwrap();
        assert!(path_match(&FPath::new("a/b/c.txt", Platform::Posix).unwrap(), &pat, false));
        assert!(path_match(&FPath::new("a/b/d/c.txt", Platform::Posix).unwrap(), &pat, false));
        assert!(!path_match(&FPath::new("a/c.txt", Platform::Posix).unwrap(), &pat, false));
    }

    #[test]
    fn self_matching_wildcard_matches_empty_level() {
        let pat = FPath::new("a/***/c.txt", Platform::Posix).unwrap();
        assert!(path_match(&FPath::new("a/c.txt", Platform::Posix).unwrap(), &pat, false));
        assert!(path_match(&FPath::new("a/b/c.txt", Platform::Posix).unwrap(), &pat, false));
    }

    #[test]
    fn search_walks_tree_s5_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::create_dir_all(root.join("a/e")).unwrap();
        std::fs::write(root.join("a/b/c.txt"), b"x").unwrap();
        std::fs::write(root.join("a/b/d.txt"), b"x").unwrap();
        std::fs::write(root.join("a/e/c.txt"), b"x").unwrap();

        let start = DirPath::new(root.to_string_lossy().into_owned(), Platform::HOST).unwrap();
        let pattern = FPath::new("a/**/c.txt", Platform::HOST).unwrap();
        let mut hits = Vec::new();
        path_search(&start, &pattern, &SearchOptions::default(), |p| {
            hits.push(p.as_str().to_string());
            true
        })
        .unwrap();
        hits.sort();
        assert_eq!(hits, vec!["a/b/c.txt".to_string(), "a/e/c.txt".to_string()]);
    }
}
