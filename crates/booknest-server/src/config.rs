use std::{fs, path::PathBuf};

use crate::error::Result;
pub use clap::Parser;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "BOOKNEST_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "BOOKNEST_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "BOOKNEST_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/booknest.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "BOOKNEST_DATA_DIR",
        help = "Data directory (database, cover images), default is system default like ~/.local/share/booknest",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "BOOKNEST_COVERS_DIR",
        help = "Directory for stored cover images, default data_dir"
    )]
    covers_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "BOOKNEST_UPLOAD_LIMIT_MB",
        default_value = "6",
        help = "Maximum request body size for the edit form in MB, slightly above the 5 MB cover policy"
    )]
    pub upload_limit_mb: usize,
}

fn default_data_dir() -> String {
    let dir = dirs::data_dir()
        .map(|p| p.join("booknest"))
        .unwrap_or_else(|| PathBuf::from("booknest"));

    if !fs::exists(&dir).expect("Failed to check if data directory exists") {
        fs::create_dir_all(&dir).expect("Failed to create data directory");
    } else if !dir.is_dir() {
        panic!("Data directory is not a directory")
    }

    dir.to_string_lossy().to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn covers_dir(&self) -> PathBuf {
        self.covers_dir.clone().unwrap_or_else(|| self.data_dir())
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/booknest.db?mode=rwc", self.data_dir))
    }
}
