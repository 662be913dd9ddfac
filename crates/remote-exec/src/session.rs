use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use ssh2::{CheckResult, ExtendedData, FileStat, KnownHostFileKind, Session, Sftp};
use tracing::{debug, info, warn};

use crate::auth::{build_auth_chain, default_key_dir, AuthMethod};
use crate::shell::remote_parent;
use crate::{BestEffort, CommandOutput, DirEntry, ExecError, FileInfo, Host};

pub const DEFAULT_SSH_PORT: u16 = 22;

const REMOTE_TEMP_DIR: &str = "/tmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyPolicy {
    /// Any host key is accepted. Convenient on a LAN, unsafe elsewhere.
    #[default]
    AcceptAny,
    /// The key must match an entry in `~/.ssh/known_hosts`.
    KnownHosts,
}

#[derive(Clone)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
    pub host_key_policy: HostKeyPolicy,
}

impl RemoteConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: user.into(),
            password: None,
            key_file: None,
            host_key_policy: HostKeyPolicy::default(),
        }
    }

    /// Parses `user@host` or `user@host:port`.
    pub fn from_destination(destination: &str) -> Option<Self> {
        let (user, rest) = destination.trim().split_once('@')?;
        let user = user.trim();
        if user.is_empty() {
            return None;
        }
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().ok()?),
            None => (rest, DEFAULT_SSH_PORT),
        };
        let host = host.trim();
        if host.is_empty() {
            return None;
        }
        let mut config = Self::new(host, user);
        config.port = port;
        Some(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("key_file", &self.key_file)
            .field("host_key_policy", &self.host_key_policy)
            .finish()
    }
}

/// One authenticated SSH connection with an SFTP channel multiplexed over it.
///
/// File and command operations fail with [`ExecError::NotConnected`] until
/// [`RemoteSession::connect`] succeeds. The session is never reconnected
/// implicitly.
pub struct RemoteSession {
    config: RemoteConfig,
    session: Option<Session>,
    sftp: Option<Sftp>,
}

impl RemoteSession {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            session: None,
            sftp: None,
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some() && self.sftp.is_some()
    }

    pub fn connect(&mut self) -> Result<(), ExecError> {
        if self.is_connected() {
            debug!(event = "ssh.connect.reuse", addr = %self.config.address(), "already connected");
            return Ok(());
        }
        let key_dir = default_key_dir();
        let chain = build_auth_chain(&self.config, key_dir.as_deref())?;
        let addr = self.config.address();
        info!(
            event = "ssh.connect.start",
            addr = %addr,
            user = %self.config.user,
            methods = ?chain,
            "connecting"
        );

        let tcp = TcpStream::connect(&addr).map_err(|source| ExecError::Connect {
            addr: addr.clone(),
            source,
        })?;
        let mut session = Session::new().map_err(|source| ExecError::Handshake {
            addr: addr.clone(),
            source,
        })?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|source| ExecError::Handshake {
            addr: addr.clone(),
            source,
        })?;

        let established = self
            .verify_host_key(&session)
            .and_then(|()| authenticate(&session, &self.config.user, &chain));
        if let Err(err) = established {
            let _ = disconnect(&session, &addr);
            return Err(err);
        }

        let sftp = match session.sftp() {
            Ok(sftp) => sftp,
            Err(err) => {
                let _ = disconnect(&session, &addr);
                return Err(ExecError::Sftp(err));
            }
        };
        info!(event = "ssh.connect.ready", addr = %addr, "ssh and sftp sessions established");
        self.session = Some(session);
        self.sftp = Some(sftp);
        Ok(())
    }

    /// Releases the SFTP channel and the SSH session. Safe to call repeatedly.
    pub fn close(&mut self) -> BestEffort {
        drop(self.sftp.take());
        match self.session.take() {
            Some(session) => disconnect(&session, &self.config.address()),
            None => BestEffort::Done,
        }
    }

    fn sftp(&self) -> Result<&Sftp, ExecError> {
        self.sftp.as_ref().ok_or(ExecError::NotConnected)
    }

    fn verify_host_key(&self, session: &Session) -> Result<(), ExecError> {
        let host = self.config.host.clone();
        match self.config.host_key_policy {
            HostKeyPolicy::AcceptAny => {
                warn!(
                    event = "ssh.host_key.unverified",
                    host = %host,
                    "host key verification disabled"
                );
                Ok(())
            }
            HostKeyPolicy::KnownHosts => {
                let reject = |reason: String| ExecError::HostKey {
                    host: host.clone(),
                    reason,
                };
                let (key, _) = session
                    .host_key()
                    .ok_or_else(|| reject("server sent no host key".to_string()))?;
                let known_hosts_path = default_key_dir()
                    .map(|dir| dir.join("known_hosts"))
                    .ok_or_else(|| reject("home directory not found".to_string()))?;
                let mut known = session
                    .known_hosts()
                    .map_err(|err| reject(err.to_string()))?;
                known
                    .read_file(&known_hosts_path, KnownHostFileKind::OpenSSH)
                    .map_err(|err| reject(format!("{}: {err}", known_hosts_path.display())))?;
                match known.check_port(&self.config.host, self.config.port, key) {
                    CheckResult::Match => Ok(()),
                    CheckResult::NotFound => Err(reject("not present in known_hosts".to_string())),
                    CheckResult::Mismatch => {
                        Err(reject("does not match known_hosts entry".to_string()))
                    }
                    CheckResult::Failure => Err(reject("known_hosts check failed".to_string())),
                }
            }
        }
    }
}

fn authenticate(session: &Session, user: &str, chain: &[AuthMethod]) -> Result<(), ExecError> {
    for method in chain {
        let attempt = match method {
            AuthMethod::KeyFile(path) => session.userauth_pubkey_file(user, None, path, None),
            AuthMethod::Password(password) => session.userauth_password(user, password),
        };
        match attempt {
            Ok(()) if session.authenticated() => {
                info!(event = "ssh.auth.ok", method = %method.label(), "authenticated");
                return Ok(());
            }
            Ok(()) => {}
            Err(err) => {
                warn!(
                    event = "ssh.auth.rejected",
                    method = %method.label(),
                    error = %err,
                    "auth method rejected"
                );
            }
        }
    }
    Err(ExecError::Authentication {
        user: user.to_string(),
        methods: chain
            .iter()
            .map(AuthMethod::label)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn disconnect(session: &Session, addr: &str) -> BestEffort {
    BestEffort::attempt(
        "ssh.disconnect",
        addr,
        session.disconnect(None, "closing", None),
    )
}

fn mkdir_all(sftp: &Sftp, path: &str) -> Result<(), ssh2::Error> {
    if is_remote_dir(sftp, path) {
        return Ok(());
    }
    if let Some(parent) = remote_parent(path) {
        if parent != path {
            mkdir_all(sftp, parent)?;
        }
    }
    match sftp.mkdir(Path::new(path), 0o755) {
        Ok(()) => Ok(()),
        // Lost a race with another writer, or the server reports EEXIST oddly.
        Err(_) if is_remote_dir(sftp, path) => Ok(()),
        Err(err) => Err(err),
    }
}

fn is_remote_dir(sftp: &Sftp, path: &str) -> bool {
    sftp.stat(Path::new(path))
        .map(|stat| stat.is_dir())
        .unwrap_or(false)
}

impl Host for RemoteSession {
    fn describe(&self) -> String {
        format!("{}@{}", self.config.user, self.config.address())
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, ExecError> {
        let sftp = self.sftp()?;
        let mut file = sftp
            .open(Path::new(path))
            .map_err(|err| ExecError::file_access("open", path, err))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|err| ExecError::file_access("read", path, err))?;
        Ok(data)
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> Result<(), ExecError> {
        let sftp = self.sftp()?;
        if let Some(parent) = remote_parent(path) {
            let _ = self.ensure_dir(parent);
        }
        let mut file = sftp
            .create(Path::new(path))
            .map_err(|err| ExecError::file_access("create", path, err))?;
        file.write_all(data)
            .map_err(|err| ExecError::file_access("write", path, err))?;
        drop(file);
        let stat = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: Some(mode),
            atime: None,
            mtime: None,
        };
        sftp.setstat(Path::new(path), stat)
            .map_err(|err| ExecError::file_access("chmod", path, err))
    }

    fn stat(&self, path: &str) -> Result<FileInfo, ExecError> {
        let stat = self
            .sftp()?
            .stat(Path::new(path))
            .map_err(|err| ExecError::file_access("stat", path, err))?;
        Ok(FileInfo {
            is_dir: stat.is_dir(),
            size: stat.size,
            mode: stat.perm.map(|perm| perm & 0o7777),
        })
    }

    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, ExecError> {
        let entries = self
            .sftp()?
            .readdir(Path::new(path))
            .map_err(|err| ExecError::file_access("list", path, err))?;
        Ok(entries
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_string_lossy().into_owned();
                Some(DirEntry {
                    name,
                    is_dir: stat.is_dir(),
                })
            })
            .collect())
    }

    fn home_dir(&self) -> Result<String, ExecError> {
        let home = self
            .sftp()?
            .realpath(Path::new("."))
            .map_err(|err| ExecError::file_access("resolve", "~", err))?;
        Ok(home.to_string_lossy().into_owned())
    }

    fn run_command(&self, command: &str) -> Result<CommandOutput, ExecError> {
        let session = self.session.as_ref().ok_or(ExecError::NotConnected)?;
        debug!(event = "ssh.command", command, "running remote command");
        let mut channel = session
            .channel_session()
            .map_err(|err| ExecError::command(command, err))?;
        channel
            .handle_extended_data(ExtendedData::Merge)
            .map_err(|err| ExecError::command(command, err))?;
        channel
            .exec(command)
            .map_err(|err| ExecError::command(command, err))?;
        let mut raw = Vec::new();
        channel
            .read_to_end(&mut raw)
            .map_err(|err| ExecError::command(command, err))?;
        channel
            .wait_close()
            .map_err(|err| ExecError::command(command, err))?;
        let exit_code = channel
            .exit_status()
            .map_err(|err| ExecError::command(command, err))?;
        Ok(CommandOutput {
            exit_code,
            output: String::from_utf8_lossy(&raw).into_owned(),
        })
    }

    fn ensure_dir(&self, path: &str) -> BestEffort {
        let result = self
            .sftp()
            .and_then(|sftp| {
                mkdir_all(sftp, path).map_err(|err| ExecError::file_access("mkdir", path, err))
            });
        BestEffort::attempt("mkdir", path, result)
    }

    fn remove_file(&self, path: &str) -> BestEffort {
        let result = self.sftp().and_then(|sftp| {
            sftp.unlink(Path::new(path))
                .map_err(|err| ExecError::file_access("remove", path, err))
        });
        BestEffort::attempt("remove", path, result)
    }

    fn temp_dir(&self) -> String {
        REMOTE_TEMP_DIR.to_string()
    }
}
