use std::path::PathBuf;
use thiserror::Error;

/// Failure while fetching case data or boundary files.
///
/// Municipalities missing from one of the two sources are not errors; they
/// render as a zero count.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("cannot read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {what}")]
    Decode {
        what: &'static str,
        #[source]
        source: simd_json::Error,
    },
    #[error("invalid GeoJSON in {origin}")]
    GeoJson {
        origin: String,
        #[source]
        source: Box<geojson::Error>,
    },
}

impl FetchError {
    /// Short, user-facing summary for the status bar.
    pub fn summary(&self) -> String {
        match self {
            FetchError::Http { .. } => "falha de rede".to_string(),
            FetchError::Status { status, .. } => format!("API respondeu {status}"),
            FetchError::Io { path, .. } => format!("arquivo ausente: {}", path.display()),
            FetchError::Decode { what, .. } => format!("resposta inválida ({what})"),
            FetchError::GeoJson { .. } => "GeoJSON inválido".to_string(),
        }
    }
}
