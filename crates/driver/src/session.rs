//! Per-sensor script sessions.
//!
//! Each open sensor owns at most one loaded image. A failed load keeps
//! whatever image was loaded before it.

use chrono::{DateTime, Utc};
use sensorasm_assembler::{assemble, AssemblerConfig, AssemblerError, Image};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("sensor {0} is already open")]
    AlreadyOpen(SensorId),

    #[error("sensor {0} is not open")]
    NotOpen(SensorId),

    #[error("session registry is full (capacity: {0})")]
    RegistryFull(usize),

    #[error("script for sensor {sensor} failed: {source}")]
    Script {
        sensor: SensorId,
        #[source]
        source: AssemblerError,
    },
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Identifier of a physical sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(pub u32);

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Configuration for the session registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Limits applied to every script compile.
    pub assembler: AssemblerConfig,
    /// Maximum number of open sensors.
    pub max_sessions: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            assembler: AssemblerConfig::default(),
            max_sessions: 8,
        }
    }
}

/// State of one open sensor.
#[derive(Debug, Clone)]
pub struct SensorSession {
    pub id: SensorId,
    pub name: String,
    /// Last successfully compiled script.
    pub image: Option<Image>,
    /// blake3 digest of the source that produced `image`.
    pub digest: Option<blake3::Hash>,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Number of successful loads, including the first.
    pub reloads: u64,
}

impl SensorSession {
    fn new(id: SensorId, name: String) -> Self {
        Self {
            id,
            name,
            image: None,
            digest: None,
            loaded_at: None,
            reloads: 0,
        }
    }
}

/// Open sensors keyed by id.
///
/// Sessions share no state; each compile runs on its own program.
pub struct SessionRegistry {
    config: RegistryConfig,
    sessions: HashMap<SensorId, SensorSession>,
}

impl SessionRegistry {
    /// Create a registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with the given configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Number of open sensors.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Open a sensor with no script loaded.
    pub fn open(&mut self, id: SensorId, name: impl Into<String>) -> Result<&SensorSession> {
        if self.sessions.contains_key(&id) {
            return Err(DriverError::AlreadyOpen(id));
        }
        if self.sessions.len() >= self.config.max_sessions {
            return Err(DriverError::RegistryFull(self.config.max_sessions));
        }

        let session = SensorSession::new(id, name.into());
        tracing::info!(sensor = %id, name = %session.name, "opened sensor");
        Ok(&*self.sessions.entry(id).or_insert(session))
    }

    /// Close a sensor and drop its loaded image.
    pub fn close(&mut self, id: SensorId) -> Result<SensorSession> {
        let session = self.sessions.remove(&id).ok_or(DriverError::NotOpen(id))?;
        tracing::info!(sensor = %id, "closed sensor");
        Ok(session)
    }

    /// Compile `source` and make it the sensor's loaded image.
    ///
    /// Reloading the source that is already loaded does not recompile.
    pub fn load_script(&mut self, id: SensorId, source: &[u8]) -> Result<&Image> {
        let assembler = &self.config.assembler;
        let session = self.sessions.get_mut(&id).ok_or(DriverError::NotOpen(id))?;

        let digest = blake3::hash(source);
        if session.digest == Some(digest) && session.image.is_some() {
            tracing::debug!(sensor = %id, digest = %digest.to_hex(), "script unchanged");
        } else {
            let image = match assemble(source, assembler) {
                Ok(image) => image,
                Err(err) => {
                    match err.line() {
                        Some(line) => tracing::warn!(sensor = %id, line, "script rejected: {}", err),
                        None => tracing::warn!(sensor = %id, "script rejected: {}", err),
                    }
                    return Err(DriverError::Script {
                        sensor: id,
                        source: err,
                    });
                }
            };

            tracing::info!(
                sensor = %id,
                digest = %digest.to_hex(),
                instructions = image.instructions.len(),
                "loaded script"
            );
            session.image = Some(image);
            session.digest = Some(digest);
            session.loaded_at = Some(Utc::now());
            session.reloads += 1;
        }

        session.image.as_ref().ok_or(DriverError::NotOpen(id))
    }

    /// Loaded image of an open sensor.
    pub fn image(&self, id: SensorId) -> Option<&Image> {
        self.sessions.get(&id).and_then(|session| session.image.as_ref())
    }

    pub fn session(&self, id: SensorId) -> Option<&SensorSession> {
        self.sessions.get(&id)
    }

    /// All open sessions, ordered by id.
    pub fn sessions(&self) -> Vec<&SensorSession> {
        let mut sessions: Vec<_> = self.sessions.values().collect();
        sessions.sort_by_key(|session| session.id);
        sessions
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
