//! Cross-platform shell command utilities.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Returns the appropriate shell command and argument for the current platform.
///
/// Returns `(shell_program, shell_arg)` where:
/// - Windows: `("cmd", "/C")`
/// - Unix-like: `("/bin/sh", "-c")`
#[must_use]
pub fn get_shell_command() -> (PathBuf, &'static str) {
    if cfg!(windows) {
        (PathBuf::from("cmd"), "/C")
    } else {
        (PathBuf::from("/bin/sh"), "-c")
    }
}

/// Resolve an executable by name.
///
/// Absolute paths are accepted as-is when they point at a file; anything
/// else is looked up on `PATH`.
#[must_use]
pub fn resolve_executable_path(executable: &str) -> Option<PathBuf> {
    if executable.trim().is_empty() {
        return None;
    }

    let path = Path::new(executable);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    which::which(executable).ok()
}

/// Render a full shell invocation for logs.
#[must_use]
pub fn display_invocation(program: &Path, arg: &str, command: &str) -> String {
    let quoted = shlex::try_quote(command).map_or_else(|_| command.to_string(), |q| q.into_owned());
    format!("{} {arg} {quoted}", program.display())
}

/// Which interpreter runs command payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShellChoice {
    /// The platform shell (`/bin/sh -c`, `cmd /C`).
    #[default]
    System,
    /// The user's `$SHELL`.
    Login,
    /// An explicit interpreter invoked with `-c`.
    Path(PathBuf),
}

impl ShellChoice {
    /// Program and argument used to hand a command line to the interpreter.
    ///
    /// An explicit path is not checked here: a missing interpreter is
    /// reported when the first command fails to spawn.
    #[must_use]
    pub fn command(&self) -> (PathBuf, &'static str) {
        match self {
            Self::System => get_shell_command(),
            Self::Login if cfg!(windows) => get_shell_command(),
            Self::Login => (login_shell(), "-c"),
            Self::Path(path) => (path.clone(), if cfg!(windows) { "/C" } else { "-c" }),
        }
    }
}

impl FromStr for ShellChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("shell must not be empty".to_string()),
            "system" => Ok(Self::System),
            "login" => Ok(Self::Login),
            other => {
                let resolved = resolve_executable_path(other).unwrap_or_else(|| PathBuf::from(other));
                Ok(Self::Path(resolved))
            }
        }
    }
}

impl fmt::Display for ShellChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Login => f.write_str("login"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The user's login shell from `$SHELL`, falling back to `/bin/sh`.
#[must_use]
pub fn login_shell() -> PathBuf {
    login_shell_from(std::env::var("SHELL").ok().as_deref())
}

/// Accept `shell` only if it is an absolute path to an existing file.
fn login_shell_from(shell: Option<&str>) -> PathBuf {
    if let Some(shell) = shell {
        let path = Path::new(shell);
        if path.is_absolute() && path.is_file() {
            return path.to_path_buf();
        }
        tracing::debug!(%shell, "Ignoring unusable $SHELL");
    }
    PathBuf::from("/bin/sh")
}
