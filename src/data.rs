use crate::topology::Topology;
use crate::types::EducationRecord;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const EDUCATION_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/for_user_education.json";
pub const COUNTIES_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/counties.json";

/// Shown for every kind of data unavailability.
pub const LOAD_ERROR_MESSAGE: &str = "Não foi possível carregar os dados do gráfico";
pub const LOADING_MESSAGE: &str = "Carregando dados...";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request to {location} failed: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{location} answered with status {status}")]
    Status {
        location: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} returned an empty payload")]
    EmptyPayload(String),
    #[error("{location} does not hold the expected data: {source}")]
    Malformed {
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    async fn fetch(&self, location: &str) -> Result<Value, LoadError>;
}

pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self, location: &str) -> Result<Value, LoadError> {
        let http_err = |source| LoadError::Http {
            location: location.to_string(),
            source,
        };
        let response = self.client.get(location).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                location: location.to_string(),
                status,
            });
        }
        let body = response.bytes().await.map_err(http_err)?;
        parse_body(location, &body)
    }
}

pub struct FileSource;

#[async_trait]
impl DataSource for FileSource {
    async fn fetch(&self, location: &str) -> Result<Value, LoadError> {
        let body = tokio::fs::read(location).await.map_err(|source| LoadError::Io {
            location: location.to_string(),
            source,
        })?;
        parse_body(location, &body)
    }
}

/// Sends `http://` and `https://` locations over the network and treats
/// anything else as a local path.
pub struct SourceRouter {
    http: HttpSource,
    files: FileSource,
}

impl SourceRouter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpSource::new(timeout),
            files: FileSource,
        }
    }
}

#[async_trait]
impl DataSource for SourceRouter {
    async fn fetch(&self, location: &str) -> Result<Value, LoadError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            self.http.fetch(location).await
        } else {
            self.files.fetch(location).await
        }
    }
}

fn parse_body(location: &str, body: &[u8]) -> Result<Value, LoadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::EmptyPayload(location.to_string()));
    }
    serde_json::from_slice(body).map_err(|source| LoadError::Malformed {
        location: location.to_string(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLocations {
    pub education: String,
    pub topology: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Topology is requested only once the education payload has arrived.
    #[default]
    Sequential,
    Concurrent,
}

#[derive(Debug)]
pub struct MapData {
    pub education: Vec<EducationRecord>,
    pub topology: Topology,
}

#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    Failed(String),
    Ready(Arc<MapData>),
}

impl LoadState {
    /// Every failure collapses into the one generic message; the specific
    /// cause is only logged.
    pub fn from_result(result: Result<MapData, LoadError>) -> Self {
        match result {
            Ok(data) => {
                info!(
                    records = data.education.len(),
                    objects = data.topology.objects.len(),
                    "map data loaded"
                );
                LoadState::Ready(Arc::new(data))
            }
            Err(e) => {
                warn!(error = %e, "map data unavailable");
                LoadState::Failed(LOAD_ERROR_MESSAGE.to_string())
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// `null`, `[]` and `{}` count as missing data.
fn ensure_present(location: &str, value: Value) -> Result<Value, LoadError> {
    let empty = match &value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    };
    if empty {
        Err(LoadError::EmptyPayload(location.to_string()))
    } else {
        Ok(value)
    }
}

async fn fetch_present<S: DataSource + ?Sized>(source: &S, location: &str) -> Result<Value, LoadError> {
    debug!(location, "fetching");
    let value = source.fetch(location).await?;
    ensure_present(location, value)
}

fn decode<T: DeserializeOwned>(location: &str, value: Value) -> Result<T, LoadError> {
    serde_json::from_value(value).map_err(|source| LoadError::Malformed {
        location: location.to_string(),
        source,
    })
}

pub async fn load<S: DataSource + ?Sized>(
    source: &S,
    locations: &DataLocations,
    mode: FetchMode,
) -> Result<MapData, LoadError> {
    let (education, topology) = match mode {
        FetchMode::Sequential => {
            let education = fetch_present(source, &locations.education).await?;
            let topology = fetch_present(source, &locations.topology).await?;
            (education, topology)
        }
        FetchMode::Concurrent => tokio::try_join!(
            fetch_present(source, &locations.education),
            fetch_present(source, &locations.topology)
        )?,
    };

    Ok(MapData {
        education: decode(&locations.education, education)?,
        topology: decode(&locations.topology, topology)?,
    })
}

pub async fn load_topology<S: DataSource + ?Sized>(source: &S, location: &str) -> Result<Topology, LoadError> {
    let value = fetch_present(source, location).await?;
    decode(location, value)
}

/// A running load bound to the lifetime of its owner. Dropping or
/// unmounting aborts the task, so no state is published after teardown.
pub struct Mount {
    state: watch::Receiver<LoadState>,
    task: JoinHandle<()>,
}

/// Starts the one load of this mount on the current tokio runtime.
pub fn mount(source: Arc<dyn DataSource>, locations: DataLocations, mode: FetchMode) -> Mount {
    let (tx, rx) = watch::channel(LoadState::Loading);
    let task = tokio::spawn(async move {
        let result = load(source.as_ref(), &locations, mode).await;
        // receivers may all be gone already
        let _ = tx.send(LoadState::from_result(result));
    });
    Mount { state: rx, task }
}

impl Mount {
    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.clone()
    }

    /// Waits for the first non-loading state.
    pub async fn settled(&mut self) -> LoadState {
        let settled = self
            .state
            .wait_for(|s| !s.is_loading())
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    pub async fn unmount(mut self) {
        self.task.abort();
        if let Err(e) = (&mut self.task).await {
            if e.is_cancelled() {
                debug!("loader task cancelled on unmount");
            }
        }
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        self.task.abort();
    }
}
