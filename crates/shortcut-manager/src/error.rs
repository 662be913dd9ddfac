use remote_exec::ExecError;
use steam_vdf::VdfError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, authentication and file access failures from the active host.
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("malformed shortcuts file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: VdfError,
    },
    #[error("shortcuts data has an unexpected shape: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("cannot encode shortcuts: {0}")]
    Encode(#[source] VdfError),
    #[error("no Steam users found")]
    NoUsersFound,
    #[error("cannot locate Steam installation: {0}")]
    SteamNotFound(String),
    #[error("no artwork configuration given")]
    MissingArtwork,
    #[error("{service} request failed: {message}")]
    ExternalApi {
        service: &'static str,
        message: String,
    },
}

impl Error {
    pub(crate) fn external(service: &'static str, message: impl Into<String>) -> Self {
        Error::ExternalApi {
            service,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
