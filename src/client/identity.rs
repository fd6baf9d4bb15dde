use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use crate::client::ClientError;

pub const APP_DIR: &str = "osint-terminal";
pub const ID_FILE: &str = "visitor_id";

/// The visitor id, kept in one small file so it survives restarts.
pub struct VisitorIdStore {
    path: PathBuf,
}

impl VisitorIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/osint-terminal/visitor_id`, when the platform has a data dir.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|dir| Self::new(dir.join(APP_DIR).join(ID_FILE)))
    }

    /// Returns the stored id, creating and saving one on first use.
    pub fn load_or_create(&self) -> Result<Uuid, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match raw.trim().parse() {
                Ok(id) => Ok(id),
                Err(_) => {
                    warn!("Visitor id at {} is unreadable, issuing a new one", self.path.display());
                    self.create()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => self.create(),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self) -> Result<Uuid, ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let id = Uuid::new_v4();
        fs::write(&self.path, id.to_string())?;
        info!("New visitor id stored at {}", self.path.display());
        Ok(id)
    }
}
