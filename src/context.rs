//! Local system context injected into every prompt.
//!
//! Gathering is best-effort. Each sub-gatherer returns a [`Gathered`] value
//! that says whether the result is complete (possibly empty because the
//! source does not exist) or degraded to a placeholder after a failure.

use dirs::home_dir;
use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Maximum number of executable names reported.
pub const MAX_COMMANDS: usize = 50;
/// Maximum length of the directory listing, in characters.
pub const MAX_LISTING_CHARS: usize = 1000;
/// Maximum number of history lines reported.
pub const MAX_HISTORY_LINES: usize = 10;

const LISTING_DEPTH: usize = 2;
const LISTING_PLACEHOLDER: &str = "Unable to get directory structure";
const HISTORY_FILES: [&str; 3] = [".zsh_history", ".bash_history", ".history"];
const UNKNOWN: &str = "unknown";

/// Outcome of a single best-effort gathering step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gathered<T> {
    /// The value was read successfully. It may be empty if the source is absent.
    Complete(T),
    /// Reading failed; `fallback` stands in for the real value.
    Degraded { fallback: T, reason: String },
}

impl<T> Gathered<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Complete(value) => value,
            Self::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Complete(value) => value,
            Self::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Snapshot of the local environment for one invocation.
#[derive(Debug, Clone)]
pub struct SystemContext {
    pub os: String,
    pub os_version: String,
    pub shell: String,
    pub current_dir: String,
    pub user: String,
    pub home: String,
    pub available_commands: Vec<String>,
    pub directory_structure: String,
    pub recent_commands: Vec<String>,
}

/// Collects a [`SystemContext`] from explicit inputs.
///
/// [`ContextCollector::from_env`] fills the inputs from the running process;
/// tests build one with [`ContextCollector::new`] over temp directories.
#[derive(Debug, Clone)]
pub struct ContextCollector {
    cwd: PathBuf,
    home: PathBuf,
    path_var: Option<OsString>,
    shell: Option<String>,
    user: Option<String>,
}

impl ContextCollector {
    pub fn from_env() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home = home_dir().unwrap_or_default();
        Self {
            cwd,
            home,
            path_var: env::var_os("PATH"),
            shell: env::var("SHELL").ok(),
            user: env::var("USER").ok(),
        }
    }

    pub fn new(cwd: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            home: home.into(),
            path_var: None,
            shell: None,
            user: None,
        }
    }

    pub fn with_path(mut self, path_var: impl Into<OsString>) -> Self {
        self.path_var = Some(path_var.into());
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// The user's shell, or `unknown`.
    pub fn shell(&self) -> &str {
        self.shell.as_deref().unwrap_or(UNKNOWN)
    }

    /// Gathers everything. Never fails.
    pub fn collect(&self) -> SystemContext {
        let os_version = self.os_version();
        let available_commands = self.available_commands();
        let directory_structure = self.directory_structure();
        let recent_commands = self.recent_commands();

        for (name, degraded) in [
            ("os_version", os_version.is_degraded()),
            ("available_commands", available_commands.is_degraded()),
            ("directory_structure", directory_structure.is_degraded()),
            ("recent_commands", recent_commands.is_degraded()),
        ] {
            if degraded {
                debug!("Context field '{}' degraded to fallback", name);
            }
        }

        SystemContext {
            os: env::consts::OS.to_string(),
            os_version: os_version.into_value(),
            shell: self.shell().to_string(),
            current_dir: self.cwd.display().to_string(),
            user: self.user.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            home: self.home.display().to_string(),
            available_commands: available_commands.into_value(),
            directory_structure: directory_structure.into_value(),
            recent_commands: recent_commands.into_value(),
        }
    }

    /// Kernel release as reported by `uname -r`.
    pub fn os_version(&self) -> Gathered<String> {
        match Command::new("uname").arg("-r").output() {
            Ok(output) if output.status.success() => {
                Gathered::Complete(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => Gathered::Degraded {
                fallback: UNKNOWN.to_string(),
                reason: format!("uname exited with {}", output.status),
            },
            Err(e) => Gathered::Degraded {
                fallback: UNKNOWN.to_string(),
                reason: e.to_string(),
            },
        }
    }

    /// Directories up to two levels below the working directory, one per line.
    pub fn directory_structure(&self) -> Gathered<String> {
        let mut lines = vec![".".to_string()];
        if let Err(e) = collect_directories(&self.cwd, ".", 1, &mut lines) {
            return Gathered::Degraded {
                fallback: LISTING_PLACEHOLDER.to_string(),
                reason: e.to_string(),
            };
        }

        let mut listing = lines.join("\n");
        listing.push('\n');
        Gathered::Complete(truncate_chars(&listing, MAX_LISTING_CHARS))
    }

    /// Executable names found on the search path, sorted and capped.
    pub fn available_commands(&self) -> Gathered<Vec<String>> {
        let Some(path_var) = &self.path_var else {
            return Gathered::Complete(Vec::new());
        };

        let mut commands = BTreeSet::new();
        let mut failures = Vec::new();

        for dir in env::split_paths(path_var) {
            if !dir.is_dir() {
                continue;
            }
            match fs::read_dir(&dir) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        if !is_executable(&entry.path()) {
                            continue;
                        }
                        if let Some(name) = entry.file_name().to_str() {
                            commands.insert(name.to_string());
                        }
                    }
                }
                Err(e) => failures.push(format!("{}: {}", dir.display(), e)),
            }
        }

        let commands: Vec<String> = commands.into_iter().take(MAX_COMMANDS).collect();
        if failures.is_empty() {
            Gathered::Complete(commands)
        } else {
            Gathered::Degraded {
                fallback: commands,
                reason: failures.join("; "),
            }
        }
    }

    /// Last lines of the first shell history file found in the home directory.
    pub fn recent_commands(&self) -> Gathered<Vec<String>> {
        let Some(history_file) = HISTORY_FILES
            .iter()
            .map(|name| self.home.join(name))
            .find(|path| path.exists())
        else {
            return Gathered::Complete(Vec::new());
        };

        match fs::read(&history_file) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                let lines: Vec<&str> = content.lines().collect();
                let start = lines.len().saturating_sub(MAX_HISTORY_LINES);
                let recent = lines[start..]
                    .iter()
                    .map(|line| strip_zsh_metadata(line.trim()))
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                Gathered::Complete(recent)
            }
            Err(e) => Gathered::Degraded {
                fallback: Vec::new(),
                reason: format!("{}: {}", history_file.display(), e),
            },
        }
    }
}

fn collect_directories(
    dir: &Path,
    prefix: &str,
    depth: usize,
    lines: &mut Vec<String>,
) -> std::io::Result<()> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();

    for name in names {
        let display = format!("{}/{}", prefix, name);
        lines.push(display.clone());
        if depth < LISTING_DEPTH {
            // Unreadable subdirectories are listed but not descended into.
            let _ = collect_directories(&dir.join(&name), &display, depth + 1, lines);
        }
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false)
}

/// Drops the `: <epoch>:<elapsed>;` prefix of zsh extended history.
fn strip_zsh_metadata(line: &str) -> &str {
    if line.starts_with(": ") {
        if let Some((_, command)) = line.split_once(';') {
            return command.trim();
        }
    }
    line
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_executable(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_directory_structure_lists_two_levels() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/nested/deeper")).unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("README.md"), "readme").unwrap();

        let collector = ContextCollector::new(temp.path(), temp.path());
        let listing = collector.directory_structure();

        assert!(!listing.is_degraded());
        assert_eq!(listing.value(), ".\n./docs\n./src\n./src/nested\n");
    }

    #[test]
    fn test_directory_structure_is_capped() {
        let temp = TempDir::new().unwrap();
        for i in 0..200 {
            fs::create_dir(temp.path().join(format!("directory_{:03}", i))).unwrap();
        }

        let collector = ContextCollector::new(temp.path(), temp.path());
        let listing = collector.directory_structure();

        assert_eq!(listing.value().chars().count(), MAX_LISTING_CHARS);
    }

    #[test]
    fn test_directory_structure_degrades_for_missing_cwd() {
        let temp = TempDir::new().unwrap();
        let collector = ContextCollector::new(temp.path().join("gone"), temp.path());

        let listing = collector.directory_structure();

        assert!(listing.is_degraded());
        assert_eq!(listing.value(), LISTING_PLACEHOLDER);
    }

    #[cfg(unix)]
    #[test]
    fn test_available_commands_only_lists_executables() {
        let temp = TempDir::new().unwrap();
        let bin_a = temp.path().join("bin_a");
        let bin_b = temp.path().join("bin_b");
        fs::create_dir_all(&bin_a).unwrap();
        fs::create_dir_all(&bin_b).unwrap();
        write_executable(&bin_a, "git");
        write_executable(&bin_b, "cargo");
        write_executable(&bin_b, "git");
        fs::write(bin_a.join("notes.txt"), "not executable").unwrap();

        let path = env::join_paths([&bin_a, &bin_b, &temp.path().join("missing")]).unwrap();
        let collector = ContextCollector::new(temp.path(), temp.path()).with_path(path);

        let commands = collector.available_commands();

        assert_eq!(commands, Gathered::Complete(vec!["cargo".to_string(), "git".to_string()]));
    }

    #[cfg(unix)]
    #[test]
    fn test_available_commands_capped_at_fifty() {
        let temp = TempDir::new().unwrap();
        for i in 0..80 {
            write_executable(temp.path(), &format!("tool{:02}", i));
        }

        let collector = ContextCollector::new(temp.path(), temp.path()).with_path(temp.path().as_os_str());

        assert_eq!(collector.available_commands().value().len(), MAX_COMMANDS);
    }

    #[test]
    fn test_available_commands_without_path_is_empty_and_complete() {
        let temp = TempDir::new().unwrap();
        let collector = ContextCollector::new(temp.path(), temp.path());

        assert_eq!(collector.available_commands(), Gathered::Complete(Vec::new()));
    }

    #[test]
    fn test_recent_commands_prefers_zsh_history() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".zsh_history"), ": 1700000000:0;git status\n: 1700000001:0;ls -la\n").unwrap();
        fs::write(temp.path().join(".bash_history"), "bash only\n").unwrap();

        let collector = ContextCollector::new(temp.path(), temp.path());

        assert_eq!(
            collector.recent_commands(),
            Gathered::Complete(vec!["git status".to_string(), "ls -la".to_string()])
        );
    }

    #[test]
    fn test_recent_commands_keeps_last_ten_non_blank() {
        let temp = TempDir::new().unwrap();
        let mut history = String::new();
        for i in 0..15 {
            history.push_str(&format!("cmd{}\n", i));
        }
        history.push_str("\n   \n");
        fs::write(temp.path().join(".bash_history"), history).unwrap();

        let collector = ContextCollector::new(temp.path(), temp.path());
        let recent = collector.recent_commands().into_value();

        // The two blank trailing lines count towards the window of ten.
        assert_eq!(recent.len(), 8);
        assert_eq!(recent.first().map(String::as_str), Some("cmd7"));
        assert_eq!(recent.last().map(String::as_str), Some("cmd14"));
    }

    #[test]
    fn test_recent_commands_tolerates_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".history"), b"echo \xff\xfe\nls\n").unwrap();

        let collector = ContextCollector::new(temp.path(), temp.path());
        let recent = collector.recent_commands();

        assert!(!recent.is_degraded());
        assert_eq!(recent.value().len(), 2);
        assert_eq!(recent.value()[1], "ls");
    }

    #[test]
    fn test_recent_commands_absent_vs_unreadable() {
        let temp = TempDir::new().unwrap();
        let collector = ContextCollector::new(temp.path(), temp.path());
        assert_eq!(collector.recent_commands(), Gathered::Complete(Vec::new()));

        // A directory in place of the history file cannot be read.
        fs::create_dir(temp.path().join(".zsh_history")).unwrap();
        let recent = collector.recent_commands();
        assert!(recent.is_degraded());
        assert!(recent.value().is_empty());
    }

    #[test]
    fn test_collect_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let collector = ContextCollector::new(temp.path(), temp.path());

        let context = collector.collect();

        assert_eq!(context.os, env::consts::OS);
        assert_eq!(context.shell, "unknown");
        assert_eq!(context.user, "unknown");
        assert_eq!(context.current_dir, temp.path().display().to_string());
        assert!(context.available_commands.is_empty());
    }

    #[test]
    fn test_collect_uses_explicit_shell_and_user() {
        let temp = TempDir::new().unwrap();
        let collector = ContextCollector::new(temp.path(), temp.path())
            .with_shell("/bin/zsh")
            .with_user("alice");

        let context = collector.collect();

        assert_eq!(context.shell, "/bin/zsh");
        assert_eq!(context.user, "alice");
    }

    #[test]
    fn test_strip_zsh_metadata() {
        assert_eq!(strip_zsh_metadata(": 1700000000:0;make build"), "make build");
        assert_eq!(strip_zsh_metadata("plain; command"), "plain; command");
    }
}
