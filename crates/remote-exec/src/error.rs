use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("not connected")]
    NotConnected,
    #[error("no authentication method available")]
    AuthenticationUnavailable,
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ssh handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        #[source]
        source: ssh2::Error,
    },
    #[error("host key for {host} rejected: {reason}")]
    HostKey { host: String, reason: String },
    #[error("authentication as {user} failed (tried {methods})")]
    Authentication { user: String, methods: String },
    #[error("failed to create SFTP client: {0}")]
    Sftp(#[source] ssh2::Error),
    #[error("failed to {op} {path}: {source}")]
    FileAccess {
        op: &'static str,
        path: String,
        #[source]
        source: BoxError,
    },
    #[error("command `{command}` failed: {source}")]
    Command {
        command: String,
        #[source]
        source: BoxError,
    },
}

impl ExecError {
    pub(crate) fn file_access(
        op: &'static str,
        path: &str,
        source: impl Into<BoxError>,
    ) -> Self {
        ExecError::FileAccess {
            op,
            path: path.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn command(command: &str, source: impl Into<BoxError>) -> Self {
        ExecError::Command {
            command: command.to_string(),
            source: source.into(),
        }
    }
}
