//! Architectural Enforcement
//!
//! Source scanners shared by the enforcement tests in `tests/`. They walk
//! the production sources of the relay crates and report lines that break
//! the concurrency rules:
//! - only the UI loop talks to the renderer
//! - no blocking sleeps in production code
//! - the window collection lock is never taken on a line that calls the
//!   renderer
//!
//! Everything from the first `#[cfg(test)]` onwards is treated as test code
//! and skipped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One production source file, truncated before its test module
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the relay directory, with `/` separators
    pub relative: String,
    /// Production lines, numbered from 1
    pub lines: Vec<(usize, String)>,
}

impl SourceFile {
    /// Whether the relative path ends with `suffix`
    pub fn is(&self, suffix: &str) -> bool {
        self.relative.ends_with(suffix)
    }

    /// Lines with trailing `//` comments and doc comments removed
    pub fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().filter_map(|(number, line)| {
            let code = line.split("//").next().unwrap_or(line);
            if code.trim().is_empty() {
                None
            } else {
                Some((*number, code))
            }
        })
    }
}

/// A rule broken at a specific line
#[derive(Debug)]
pub struct Violation {
    /// File the violation was found in
    pub file: String,
    /// Line number, from 1
    pub line: usize,
    /// Which rule was broken
    pub rule: &'static str,
    /// The offending source text
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} - {}: {}", self.file, self.line, self.rule, self.text.trim())
    }
}

/// The `relay/` directory of the workspace
pub fn relay_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../relay")
}

/// Read every production `.rs` file under `relay/*/src`
pub fn production_sources() -> Vec<SourceFile> {
    let root = relay_root();
    let mut files: Vec<SourceFile> = walkdir::WalkDir::new(&root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter(|entry| entry.path().components().any(|c| c.as_os_str() == "src"))
        .filter_map(|entry| read_source(&root, entry.path()))
        .collect();
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

fn read_source(root: &Path, path: &Path) -> Option<SourceFile> {
    let content = fs::read_to_string(path).ok()?;
    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let lines = content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line.to_string()))
        .collect();

    Some(SourceFile { relative, lines })
}

/// Collect a violation for every code line where `matches` holds
pub fn scan(
    files: &[SourceFile],
    rule: &'static str,
    skip: impl Fn(&SourceFile) -> bool,
    matches: impl Fn(&str) -> bool,
) -> Vec<Violation> {
    files
        .iter()
        .filter(|file| !skip(file))
        .flat_map(|file| {
            file.code_lines()
                .filter(|(_, code)| matches(code))
                .map(|(line, code)| Violation {
                    file: file.relative.clone(),
                    line,
                    rule,
                    text: code.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Panic with a readable report when any violation was found
pub fn assert_clean(violations: &[Violation], advice: &str) {
    if violations.is_empty() {
        return;
    }
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!("\n{advice}");
    panic!("Found {} architectural violation(s)", violations.len());
}
