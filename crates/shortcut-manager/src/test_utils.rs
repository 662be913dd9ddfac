use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use remote_exec::shell::remote_parent;
use remote_exec::{BestEffort, CommandOutput, DirEntry, ExecError, FileInfo, Host};

use crate::artwork::{FetchedImage, ImageFetcher};
use crate::{Error, Result};

/// In-memory POSIX filesystem with scripted command replies.
pub(crate) struct FakeHost {
    remote: bool,
    home: String,
    files: RefCell<BTreeMap<String, (Vec<u8>, u32)>>,
    dirs: RefCell<BTreeSet<String>>,
    replies: Vec<(String, CommandOutput)>,
    commands: RefCell<Vec<String>>,
}

impl FakeHost {
    pub(crate) fn local() -> Self {
        Self::new(false, "/home/tester")
    }

    pub(crate) fn remote(home: &str) -> Self {
        Self::new(true, home)
    }

    fn new(remote: bool, home: &str) -> Self {
        Self {
            remote,
            home: home.to_string(),
            files: RefCell::new(BTreeMap::new()),
            dirs: RefCell::new(BTreeSet::from(["/".to_string()])),
            replies: Vec::new(),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Commands containing `pattern` answer with `exit_code`/`output`.
    /// Unmatched commands exit 127.
    pub(crate) fn with_command(mut self, pattern: &str, exit_code: i32, output: &str) -> Self {
        self.replies.push((
            pattern.to_string(),
            CommandOutput {
                exit_code,
                output: output.to_string(),
            },
        ));
        self
    }

    pub(crate) fn put_file(&self, path: &str, data: Vec<u8>) {
        self.add_dir_chain(path, false);
        self.files
            .borrow_mut()
            .insert(path.to_string(), (data, 0o644));
    }

    pub(crate) fn put_dir(&self, path: &str) {
        self.add_dir_chain(path, true);
    }

    pub(crate) fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).map(|(data, _)| data.clone())
    }

    pub(crate) fn mode_of(&self, path: &str) -> Option<u32> {
        self.files.borrow().get(path).map(|(_, mode)| *mode)
    }

    pub(crate) fn file_paths(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    fn add_dir_chain(&self, path: &str, include_self: bool) {
        let mut dirs = self.dirs.borrow_mut();
        if include_self {
            dirs.insert(path.trim_end_matches('/').to_string());
        }
        let mut current = remote_parent(path);
        while let Some(dir) = current {
            dirs.insert(dir.to_string());
            current = if dir == "/" { None } else { remote_parent(dir) };
        }
    }
}

impl Host for FakeHost {
    fn describe(&self) -> String {
        if self.remote {
            "fake-remote".to_string()
        } else {
            "fake-local".to_string()
        }
    }

    fn is_remote(&self) -> bool {
        self.remote
    }

    fn read_file(&self, path: &str) -> std::result::Result<Vec<u8>, ExecError> {
        self.file(path).ok_or_else(|| ExecError::FileAccess {
            op: "read",
            path: path.to_string(),
            source: "no such file".into(),
        })
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> std::result::Result<(), ExecError> {
        self.add_dir_chain(path, false);
        self.files
            .borrow_mut()
            .insert(path.to_string(), (data.to_vec(), mode));
        Ok(())
    }

    fn stat(&self, path: &str) -> std::result::Result<FileInfo, ExecError> {
        if let Some((data, mode)) = self.files.borrow().get(path) {
            return Ok(FileInfo {
                is_dir: false,
                size: Some(data.len() as u64),
                mode: Some(*mode),
            });
        }
        if self.dirs.borrow().contains(path.trim_end_matches('/')) {
            return Ok(FileInfo {
                is_dir: true,
                size: None,
                mode: Some(0o755),
            });
        }
        Err(ExecError::FileAccess {
            op: "stat",
            path: path.to_string(),
            source: "no such file".into(),
        })
    }

    fn list_dir(&self, path: &str) -> std::result::Result<Vec<DirEntry>, ExecError> {
        let dir = path.trim_end_matches('/');
        if !self.dirs.borrow().contains(dir) {
            return Err(ExecError::FileAccess {
                op: "list",
                path: path.to_string(),
                source: "no such directory".into(),
            });
        }
        let is_child = |candidate: &str| remote_parent(candidate) == Some(dir);
        let name_of = |candidate: &str| {
            candidate
                .rsplit('/')
                .next()
                .unwrap_or(candidate)
                .to_string()
        };
        let mut entries: Vec<DirEntry> = self
            .dirs
            .borrow()
            .iter()
            .filter(|candidate| candidate.as_str() != "/" && is_child(candidate))
            .map(|candidate| DirEntry {
                name: name_of(candidate),
                is_dir: true,
            })
            .collect();
        entries.extend(
            self.files
                .borrow()
                .keys()
                .filter(|candidate| is_child(candidate))
                .map(|candidate| DirEntry {
                    name: name_of(candidate),
                    is_dir: false,
                }),
        );
        Ok(entries)
    }

    fn home_dir(&self) -> std::result::Result<String, ExecError> {
        Ok(self.home.clone())
    }

    fn run_command(&self, command: &str) -> std::result::Result<CommandOutput, ExecError> {
        self.commands.borrow_mut().push(command.to_string());
        let reply = self
            .replies
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or(CommandOutput {
                exit_code: 127,
                output: "command not found".to_string(),
            });
        Ok(reply)
    }

    fn ensure_dir(&self, path: &str) -> BestEffort {
        self.add_dir_chain(path, true);
        BestEffort::Done
    }

    fn remove_file(&self, path: &str) -> BestEffort {
        match self.files.borrow_mut().remove(path) {
            Some(_) => BestEffort::Done,
            None => BestEffort::Failed("no such file".to_string()),
        }
    }

    fn temp_dir(&self) -> String {
        "/tmp".to_string()
    }
}

/// Serves canned images by URL and records every request.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    images: HashMap<String, FetchedImage>,
    requests: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn with_image(mut self, url: &str, bytes: &[u8], content_type: Option<&str>) -> Self {
        self.images.insert(
            url.to_string(),
            FetchedImage {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ImageFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedImage> {
        self.requests.borrow_mut().push(url.to_string());
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| Error::external("image download", format!("{url}: HTTP 404")))
    }
}
