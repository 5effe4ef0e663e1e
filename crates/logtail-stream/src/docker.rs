//! Docker-backed log source.
//!
//! Finds pod containers by the kubelet Docker naming convention,
//! `k8s_<container>_<pod>_<namespace>_<uid>_<attempt>`, and follows their
//! logs through the Docker API.

use std::collections::HashMap;
use std::io;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{ListContainersOptions, LogOutput, LogsOptions};
use futures_util::{Stream, StreamExt, stream};
use logtail_core::{Config, Error, Result, TailRequest};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::source::{LogSource, LogStream, ReaderLogStream};

/// Opens container log streams from a Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerLogSource {
    docker: Docker,
}

impl DockerLogSource {
    /// Connect with the local defaults.
    pub fn new() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().map_err(|e| Error::Docker(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Connect through a custom socket path.
    pub fn with_socket(socket_path: &str) -> Result<Self> {
        let docker = Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
            .map_err(|e| Error::Docker(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Connect using the socket from `config`, if any.
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .docker_socket
            .as_deref()
            .map_or_else(Self::new, Self::with_socket)
    }

    /// Check that the daemon answers.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| Error::Docker(e.to_string()))?;
        Ok(())
    }

    /// Resolve the container id serving `request`.
    async fn locate(&self, request: &TailRequest) -> Result<String> {
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![instance_prefix(request)]);

        let options = Some(ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        });

        let containers = self
            .docker
            .list_containers(options)
            .await
            .map_err(|e| Error::Docker(e.to_string()))?;

        let candidates: Vec<(String, String)> = containers
            .into_iter()
            .filter_map(|summary| {
                let id = summary.id?;
                let name = summary.names?.into_iter().next()?;
                Some((id, name))
            })
            .collect();

        select_instance(request, &candidates)
    }
}

#[async_trait]
impl LogSource for DockerLogSource {
    /// Opens once the daemon has produced the first chunk, so a container
    /// that never writes keeps the open call pending.
    async fn open(&self, request: &TailRequest) -> Result<Box<dyn LogStream>> {
        let id = self.locate(request).await?;
        debug!(container_id = %id, "following container logs");

        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            tail: request
                .line_limit
                .map_or_else(|| "all".to_string(), |lines| lines.to_string()),
            ..Default::default()
        };

        let chunks = Box::pin(
            self.docker
                .logs(&id, Some(options))
                .map(|chunk| chunk.map(LogOutput::into_bytes).map_err(io::Error::other)),
        );
        let chunks = after_first_chunk(chunks).await?;

        Ok(Box::new(ReaderLogStream::new(StreamReader::new(
            Box::pin(chunks),
        ))))
    }
}

/// Wait for the first chunk and put it back in front of the rest.
///
/// The daemon reports a bad log request through the first item, so an error
/// there fails the open instead of the read.
async fn after_first_chunk<S, B>(mut chunks: S) -> Result<impl Stream<Item = io::Result<B>>>
where
    S: Stream<Item = io::Result<B>> + Unpin,
{
    let first = match chunks.next().await {
        Some(Err(e)) => return Err(Error::Stream(format!("log request failed: {e}"))),
        first => first,
    };
    Ok(stream::iter(first).chain(chunks))
}

/// Name filter matching every instance of the requested container.
fn instance_prefix(request: &TailRequest) -> String {
    format!(
        "k8s_{}_{}_{}_",
        request.container, request.pod, request.namespace
    )
}

/// Pick the current instance, or the one before it when `previous` is set.
fn select_instance(request: &TailRequest, candidates: &[(String, String)]) -> Result<String> {
    let prefix = instance_prefix(request);

    let mut instances: Vec<(u32, &str)> = candidates
        .iter()
        .filter_map(|(id, name)| {
            let rest = name.trim_start_matches('/').strip_prefix(&prefix)?;
            let (_uid, attempt) = rest.rsplit_once('_')?;
            Some((attempt.parse().ok()?, id.as_str()))
        })
        .collect();
    instances.sort_unstable_by(|a, b| b.0.cmp(&a.0));

    let index = usize::from(request.previous);
    instances
        .get(index)
        .map(|(_, id)| (*id).to_string())
        .ok_or_else(|| Error::ContainerNotFound(request.to_string()))
}
