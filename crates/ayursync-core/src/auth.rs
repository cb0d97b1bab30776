//! Bearer token storage
//!
//! The session token lives in memory and, optionally, in a token file so that
//! consecutive CLI invocations share one login. Logging out clears both and
//! notifies every subscriber.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shared handle to the current session token
#[derive(Debug, Clone)]
pub struct SessionStore {
    token: Arc<RwLock<Option<String>>>,
    token_file: Option<PathBuf>,
    authenticated: Arc<watch::Sender<bool>>,
}

impl SessionStore {
    /// Session that lives only as long as the process
    pub fn in_memory(token: Option<String>) -> Self {
        let (authenticated, _) = watch::channel(token.is_some());
        Self {
            token: Arc::new(RwLock::new(token)),
            token_file: None,
            authenticated: Arc::new(authenticated),
        }
    }

    /// Session backed by a token file; an existing file is loaded eagerly
    pub fn with_token_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let token = match fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        debug!("Loaded session from {} (present: {})", path.display(), token.is_some());

        let mut store = Self::in_memory(token);
        store.token_file = Some(path);
        Ok(store)
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Store a freshly issued token, persisting it when file-backed
    pub fn store(&self, token: impl Into<String>) -> io::Result<()> {
        let token = token.into();
        if let Some(path) = &self.token_file {
            write_token_file(path, &token)?;
        }
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        self.authenticated.send_replace(true);
        info!("Session token stored");
        Ok(())
    }

    /// Global logout: drop the token everywhere and notify subscribers
    pub fn logout(&self) {
        self.token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(path) = &self.token_file {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove token file {}: {}", path.display(), e),
            }
        }

        self.authenticated.send_replace(false);
        info!("Logged out");
    }

    /// Observe login/logout transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }
}

/// Write the token readable by its owner only
fn write_token_file(path: &Path, token: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // The mode above only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(token.as_bytes())?;
    file.flush()
}
