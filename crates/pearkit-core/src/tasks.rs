//! Ordered filesystem tasks with fail-fast execution.
//!
//! A [`TaskQueue`] holds [`FileTask`]s that are validated when they are
//! built and run strictly in the order they were queued. Execution stops at
//! the first failure. Work done by earlier tasks is not rolled back, so a
//! failed queue can leave a folder partly changed.

use regex::Regex;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Mode applied by [`FileTask::chmod`].
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Errors raised while building or running file tasks.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("invalid {task} task: {reason}")]
    InvalidArgument { task: &'static str, reason: String },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy of {} to {} failed: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TaskError {
    fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    fn copy(from: &Path, to: &Path, source: io::Error) -> Self {
        Self::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }
    }

    fn invalid(task: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            task,
            reason: reason.into(),
        }
    }
}

/// A single filesystem mutation.
///
/// Relative paths are resolved against the root of the queue the task runs
/// in; absolute paths are used as they are.
#[derive(Debug, Clone)]
pub enum FileTask {
    /// Delete a file, or a directory and everything under it.
    Remove { path: PathBuf },

    /// Create one directory. Its parent must already exist.
    MakeDirectory { path: PathBuf },

    /// Copy a file, or a directory tree, overwriting what is there.
    Copy { from: PathBuf, to: PathBuf },

    /// Set the permission bits of a file.
    Chmod { path: PathBuf, mode: u32 },

    /// Rewrite a file by applying each substitution to its whole content.
    RegexReplace {
        path: PathBuf,
        replacements: Vec<(Regex, String)>,
    },
}

fn require_path(task: &'static str, what: &str, path: &Path) -> Result<(), TaskError> {
    if path.as_os_str().is_empty() {
        return Err(TaskError::invalid(task, format!("{what} must not be empty")));
    }
    Ok(())
}

impl FileTask {
    /// Build a task that deletes `path` if it exists.
    pub fn remove(path: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let path = path.into();
        require_path("remove", "path", &path)?;
        Ok(Self::Remove { path })
    }

    /// Build a task that creates the directory `path`.
    pub fn make_directory(path: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let path = path.into();
        require_path("mkdir", "path", &path)?;
        Ok(Self::MakeDirectory { path })
    }

    /// Build a task that copies `from` to `to`.
    pub fn copy(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let from = from.into();
        let to = to.into();
        require_path("copy", "source", &from)?;
        require_path("copy", "destination", &to)?;
        Ok(Self::Copy { from, to })
    }

    /// Build a task that marks `path` executable (mode 0755).
    pub fn chmod(path: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let path = path.into();
        require_path("chmod", "path", &path)?;
        Ok(Self::Chmod {
            path,
            mode: EXECUTABLE_MODE,
        })
    }

    /// Build a task that applies a single substitution to `path`.
    pub fn regex_replace(
        path: impl Into<PathBuf>,
        pattern: &str,
        replacement: &str,
    ) -> Result<Self, TaskError> {
        Self::regex_replace_all(path, &[pattern], &[replacement])
    }

    /// Build a task that applies several substitutions to `path`, in order.
    ///
    /// `patterns` and `replacements` are parallel lists: they must have the
    /// same length and no entry may be empty. Replacements may refer to
    /// capture groups (`${1}`).
    pub fn regex_replace_all<P, R>(
        path: impl Into<PathBuf>,
        patterns: &[P],
        replacements: &[R],
    ) -> Result<Self, TaskError>
    where
        P: AsRef<str>,
        R: AsRef<str>,
    {
        let path = path.into();
        require_path("regex-replace", "path", &path)?;

        if patterns.is_empty() {
            return Err(TaskError::invalid("regex-replace", "no patterns given"));
        }
        if patterns.len() != replacements.len() {
            return Err(TaskError::invalid(
                "regex-replace",
                format!(
                    "{} patterns but {} replacements",
                    patterns.len(),
                    replacements.len()
                ),
            ));
        }

        let mut compiled = Vec::with_capacity(patterns.len());
        for (index, (pattern, replacement)) in patterns.iter().zip(replacements).enumerate() {
            let pattern = pattern.as_ref();
            let replacement = replacement.as_ref();
            if pattern.is_empty() {
                return Err(TaskError::invalid(
                    "regex-replace",
                    format!("pattern {index} is empty"),
                ));
            }
            if replacement.is_empty() {
                return Err(TaskError::invalid(
                    "regex-replace",
                    format!("replacement {index} is empty"),
                ));
            }
            let regex = Regex::new(pattern).map_err(|source| TaskError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            compiled.push((regex, replacement.to_string()));
        }

        Ok(Self::RegexReplace {
            path,
            replacements: compiled,
        })
    }

    /// Short name of the task kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Remove { .. } => "remove",
            Self::MakeDirectory { .. } => "mkdir",
            Self::Copy { .. } => "copy",
            Self::Chmod { .. } => "chmod",
            Self::RegexReplace { .. } => "regex-replace",
        }
    }

    /// Run the task with relative paths resolved against `root`.
    pub fn run(&self, root: &Path) -> Result<(), TaskError> {
        match self {
            Self::Remove { path } => remove_path(&root.join(path)),
            Self::MakeDirectory { path } => make_directory(&root.join(path)),
            Self::Copy { from, to } => copy_path(&root.join(from), &root.join(to)),
            Self::Chmod { path, mode } => set_mode(&root.join(path), *mode),
            Self::RegexReplace { path, replacements } => {
                replace_in_file(&root.join(path), replacements)
            }
        }
    }
}

impl fmt::Display for FileTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remove { path } | Self::MakeDirectory { path } => {
                write!(f, "{} {}", self.name(), path.display())
            }
            Self::Copy { from, to } => {
                write!(f, "copy {} -> {}", from.display(), to.display())
            }
            Self::Chmod { path, mode } => write!(f, "chmod {mode:o} {}", path.display()),
            Self::RegexReplace { path, replacements } => write!(
                f,
                "regex-replace {} ({} patterns)",
                path.display(),
                replacements.len()
            ),
        }
    }
}

fn remove_path(target: &Path) -> Result<(), TaskError> {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(TaskError::io("remove", target, e)),
    };

    if meta.is_dir() {
        fs::remove_dir_all(target).map_err(|e| TaskError::io("remove", target, e))
    } else {
        fs::remove_file(target).map_err(|e| TaskError::io("remove", target, e))
    }
}

fn make_directory(target: &Path) -> Result<(), TaskError> {
    if target.is_dir() {
        return Ok(());
    }
    if target.exists() {
        return Err(TaskError::io(
            "mkdir",
            target,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ),
        ));
    }
    fs::create_dir(target).map_err(|e| TaskError::io("mkdir", target, e))
}

fn copy_path(from: &Path, to: &Path) -> Result<(), TaskError> {
    let meta = fs::metadata(from).map_err(|e| TaskError::io("copy", from, e))?;
    if meta.is_dir() {
        copy_tree(from, to)
    } else {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| TaskError::copy(from, to, e))
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), TaskError> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            TaskError::io("copy", path, e.into())
        })?;

        let dest = if entry.depth() == 0 {
            to.to_path_buf()
        } else {
            match entry.path().strip_prefix(from) {
                Ok(relative) => to.join(relative),
                Err(_) => continue,
            }
        };

        if entry.file_type().is_dir() {
            prepare_directory(&dest)?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| TaskError::copy(entry.path(), &dest, e))?;
        }
    }
    Ok(())
}

/// Make sure `dest` is a directory, replacing a file that is in the way.
fn prepare_directory(dest: &Path) -> Result<(), TaskError> {
    if dest.is_dir() {
        return Ok(());
    }
    if fs::symlink_metadata(dest).is_ok() {
        fs::remove_file(dest).map_err(|e| TaskError::io("copy", dest, e))?;
    }
    fs::create_dir_all(dest).map_err(|e| TaskError::io("copy", dest, e))
}

#[cfg(unix)]
fn set_mode(target: &Path, mode: u32) -> Result<(), TaskError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(target, fs::Permissions::from_mode(mode))
        .map_err(|e| TaskError::io("chmod", target, e))
}

#[cfg(not(unix))]
fn set_mode(target: &Path, _mode: u32) -> Result<(), TaskError> {
    // No executable bit to set; only check that the file is there.
    fs::metadata(target)
        .map(|_| ())
        .map_err(|e| TaskError::io("chmod", target, e))
}

fn replace_in_file(target: &Path, replacements: &[(Regex, String)]) -> Result<(), TaskError> {
    let mut content =
        fs::read_to_string(target).map_err(|e| TaskError::io("regex-replace", target, e))?;

    for (pattern, replacement) in replacements {
        content = pattern
            .replace_all(&content, replacement.as_str())
            .into_owned();
    }

    fs::write(target, content).map_err(|e| TaskError::io("regex-replace", target, e))
}

/// An ordered list of [`FileTask`]s bound to a root directory.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    root: PathBuf,
    tasks: Vec<FileTask>,
}

impl TaskQueue {
    /// Create an empty queue whose relative paths resolve against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tasks: Vec::new(),
        }
    }

    /// The directory relative task paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append a task to the end of the queue.
    pub fn enqueue(&mut self, task: FileTask) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// The tasks still waiting to run.
    #[must_use]
    pub fn tasks(&self) -> &[FileTask] {
        &self.tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every queued task in order and empty the queue.
    ///
    /// Stops at the first failing task and returns its error; tasks after
    /// it are discarded without running. Returns the number of tasks run.
    pub fn execute_all(&mut self) -> Result<usize, TaskError> {
        let tasks = std::mem::take(&mut self.tasks);
        let total = tasks.len();

        for (index, task) in tasks.iter().enumerate() {
            debug!(root = %self.root.display(), task = %task, "running file task");
            if let Err(e) = task.run(&self.root) {
                debug!(
                    failed = index + 1,
                    skipped = total - index - 1,
                    "file task failed, abandoning queue"
                );
                return Err(e);
            }
        }

        Ok(total)
    }
}
