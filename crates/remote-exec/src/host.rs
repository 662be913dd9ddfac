use crate::shell::{join_remote, remote_parent};
use crate::{BestEffort, ExecError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    pub size: Option<u64>,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    /// Interleaved stdout and stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The machine an operation runs against.
///
/// Paths are plain strings because remote paths are always POSIX regardless of
/// the local platform.
pub trait Host {
    /// Short label for logs, e.g. `local` or `deck@steamdeck:22`.
    fn describe(&self) -> String;

    fn is_remote(&self) -> bool;

    fn read_file(&self, path: &str) -> Result<Vec<u8>, ExecError>;

    /// Creates missing parent directories (best effort), truncates or creates
    /// the file, writes all bytes, then applies `mode`.
    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> Result<(), ExecError>;

    fn stat(&self, path: &str) -> Result<FileInfo, ExecError>;

    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, ExecError>;

    fn home_dir(&self) -> Result<String, ExecError>;

    /// Runs one shell command line; arguments must already be quoted.
    fn run_command(&self, command: &str) -> Result<CommandOutput, ExecError>;

    fn ensure_dir(&self, path: &str) -> BestEffort;

    fn remove_file(&self, path: &str) -> BestEffort;

    fn temp_dir(&self) -> String;

    /// Never fails: any stat error means the path does not exist.
    fn file_exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    fn join_path(&self, base: &str, name: &str) -> String {
        join_remote(base, name)
    }

    fn parent_dir(&self, path: &str) -> Option<String> {
        remote_parent(path).map(str::to_string)
    }
}
