use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::{BestEffort, CommandOutput, DirEntry, ExecError, FileInfo, Host};

/// The machine this process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl Host for LocalHost {
    fn describe(&self) -> String {
        "local".to_string()
    }

    fn is_remote(&self) -> bool {
        false
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, ExecError> {
        std::fs::read(path).map_err(|err| ExecError::file_access("read", path, err))
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> Result<(), ExecError> {
        if let Some(parent) = self.parent_dir(path) {
            let _ = self.ensure_dir(&parent);
        }
        std::fs::write(path, data).map_err(|err| ExecError::file_access("write", path, err))?;
        set_mode(path, mode)
    }

    fn stat(&self, path: &str) -> Result<FileInfo, ExecError> {
        let metadata =
            std::fs::metadata(path).map_err(|err| ExecError::file_access("stat", path, err))?;
        Ok(FileInfo {
            is_dir: metadata.is_dir(),
            size: Some(metadata.len()),
            mode: file_mode(&metadata),
        })
    }

    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, ExecError> {
        let entries =
            std::fs::read_dir(path).map_err(|err| ExecError::file_access("list", path, err))?;
        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| ExecError::file_access("list", path, err))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks so a linked userdata directory still counts.
            let is_dir = entry.path().is_dir();
            result.push(DirEntry { name, is_dir });
        }
        Ok(result)
    }

    fn home_dir(&self) -> Result<String, ExecError> {
        dirs::home_dir()
            .map(|home| home.to_string_lossy().into_owned())
            .ok_or_else(|| ExecError::file_access("resolve", "~", "home directory not found"))
    }

    fn run_command(&self, command: &str) -> Result<CommandOutput, ExecError> {
        debug!(event = "local.command", command, "running local command");
        let output = shell_command(command)
            .output()
            .map_err(|err| ExecError::command(command, err))?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }

    fn ensure_dir(&self, path: &str) -> BestEffort {
        BestEffort::attempt("mkdir", path, std::fs::create_dir_all(path))
    }

    fn remove_file(&self, path: &str) -> BestEffort {
        BestEffort::attempt("remove", path, std::fs::remove_file(path))
    }

    fn temp_dir(&self) -> String {
        std::env::temp_dir().to_string_lossy().into_owned()
    }

    fn join_path(&self, base: &str, name: &str) -> String {
        Path::new(base).join(name).to_string_lossy().into_owned()
    }

    fn parent_dir(&self, path: &str) -> Option<String> {
        Path::new(path)
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(|parent| parent.to_string_lossy().into_owned())
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(unix)]
fn set_mode(path: &str, mode: u32) -> Result<(), ExecError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|err| ExecError::file_access("chmod", path, err))
}

#[cfg(not(unix))]
fn set_mode(_path: &str, _mode: u32) -> Result<(), ExecError> {
    Ok(())
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}
