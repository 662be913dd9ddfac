//! Uniform local/remote filesystem and command execution.
//!
//! Everything that touches a Steam installation goes through [`Host`], which is
//! implemented by [`LocalHost`] for the current machine and by [`RemoteSession`]
//! for a machine reached over SSH/SFTP.

mod auth;
mod best_effort;
mod error;
mod host;
mod local;
mod session;
pub mod shell;

pub use auth::{build_auth_chain, default_key_dir, AuthMethod, DEFAULT_KEY_NAMES};
pub use best_effort::BestEffort;
pub use error::ExecError;
pub use host::{CommandOutput, DirEntry, FileInfo, Host};
pub use local::LocalHost;
pub use session::{HostKeyPolicy, RemoteConfig, RemoteSession, DEFAULT_SSH_PORT};
