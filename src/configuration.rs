use std::fmt;
use std::net::SocketAddr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-process maps, lost on exit.
    Memory,
    /// A single SQLite file in the data dir.
    Sqlite,
    /// JSON documents in the data dir.
    Document,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Document => "document",
        })
    }
}

#[derive(Clone, Debug)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug)]
pub struct Configuration {
    pub data_dir: String,
    pub storage: StorageBackend,
    pub listen: SocketAddr,
    pub public_url: String,
    pub google: Option<GoogleCredentials>,
    pub log_file: Option<String>,
    pub reset: bool,
}

impl Configuration {
    /// Session cookies are marked `Secure` once the app is served over https.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}
