//! Container view of a pod.
//!
//! Turns a pod description, plus an optional usage sample fetched elsewhere,
//! into the display rows shown next to a container's log tail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for values the pod does not report.
pub const MISSING_VALUE: &str = "<none>";

/// Column names, in field order.
pub const HEADER: [&str; 12] = [
    "NAME", "IMAGE", "READY", "STATE", "RS", "LPROB", "RPROB", "CPU", "MEM", "RCPU", "RMEM",
    "AGE",
];

const MEGABYTE: i64 = 1024 * 1024;

/// CPU and memory quantities of a request or limit block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    /// CPU in millicores.
    pub cpu_millis: Option<i64>,
    /// Memory in bytes.
    pub memory_bytes: Option<i64>,
}

impl ResourceList {
    /// True when neither quantity is set.
    pub const fn is_empty(&self) -> bool {
        self.cpu_millis.is_none() && self.memory_bytes.is_none()
    }

    fn columns(&self) -> (String, String) {
        (
            to_millicore(self.cpu_millis.unwrap_or_default()),
            to_mi(self.memory_bytes.unwrap_or_default()),
        )
    }
}

/// Container definition from the pod spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name, unique within the pod.
    pub name: String,
    /// Image reference the container runs.
    pub image: String,
    /// Whether a liveness check is configured.
    pub liveness_probe: bool,
    /// Whether a readiness check is configured.
    pub readiness_probe: bool,
    /// Requested resources.
    pub requests: ResourceList,
    /// Resource limits.
    pub limits: ResourceList,
}

/// Last known state of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    /// Not started yet.
    Waiting {
        /// Why the container is waiting, if reported.
        reason: Option<String>,
    },
    /// Running.
    Running,
    /// Exited.
    Terminated {
        /// Why the container exited, if reported.
        reason: Option<String>,
    },
    /// No state reported.
    #[default]
    Unknown,
}

impl ContainerState {
    /// Short label for the STATE column.
    pub fn label(&self) -> String {
        match self {
            Self::Waiting { reason } => non_empty(reason.as_deref()).unwrap_or("Waiting").into(),
            Self::Terminated { reason } => {
                non_empty(reason.as_deref()).unwrap_or("Terminated").into()
            }
            Self::Running => "Running".into(),
            Self::Unknown => MISSING_VALUE.into(),
        }
    }
}

fn non_empty(reason: Option<&str>) -> Option<&str> {
    reason.filter(|r| !r.is_empty())
}

/// Runtime status reported for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// Name of the container this status belongs to.
    pub name: String,
    /// Whether the container passes its readiness check.
    pub ready: bool,
    /// Current state.
    pub state: ContainerState,
    /// Restarts since the pod was created.
    pub restart_count: u32,
}

/// A usage sample for one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerUsage {
    /// Name of the sampled container.
    pub name: String,
    /// CPU in millicores.
    pub cpu_millis: i64,
    /// Memory in bytes.
    pub memory_bytes: i64,
}

/// Everything needed to describe a pod's containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodView {
    /// Namespace of the pod.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// When the pod was created.
    pub created_at: DateTime<Utc>,
    /// Init containers, in spec order.
    pub init_containers: Vec<ContainerSpec>,
    /// Regular containers, in spec order.
    pub containers: Vec<ContainerSpec>,
    /// Statuses of the init containers.
    pub init_statuses: Vec<ContainerStatus>,
    /// Statuses of the regular containers.
    pub statuses: Vec<ContainerStatus>,
    /// Usage sample, when the metrics server provided one.
    pub usage: Option<Vec<ContainerUsage>>,
}

/// One displayable container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRow {
    /// `namespace/pod:container`.
    pub path: String,
    /// Whether this is an init container.
    pub is_init: bool,
    /// Values matching [`HEADER`].
    pub fields: Vec<String>,
}

/// Build the rows for every container of a pod, init containers first.
pub fn container_rows(pod: &PodView, now: DateTime<Utc>) -> Vec<ContainerRow> {
    let init = pod.init_containers.iter().map(|co| (co, true));
    let regular = pod.containers.iter().map(|co| (co, false));

    init.chain(regular)
        .map(|(co, is_init)| ContainerRow {
            path: format!("{}/{}:{}", pod.namespace, pod.name, co.name),
            is_init,
            fields: fields(pod, co, now),
        })
        .collect()
}

fn fields(pod: &PodView, co: &ContainerSpec, now: DateTime<Utc>) -> Vec<String> {
    let (cpu, mem) = pod
        .usage
        .iter()
        .flatten()
        .find(|usage| usage.name == co.name)
        .map_or((0, 0), |usage| (usage.cpu_millis, usage.memory_bytes));
    let (rcpu, rmem) = resources(co);

    let status = pod
        .statuses
        .iter()
        .find(|s| s.name == co.name)
        .or_else(|| pod.init_statuses.iter().find(|s| s.name == co.name));
    let (ready, state, restarts) = status.map_or_else(
        || ("false".to_string(), MISSING_VALUE.to_string(), "0".to_string()),
        |cs| {
            (
                cs.ready.to_string(),
                cs.state.label(),
                cs.restart_count.to_string(),
            )
        },
    );

    vec![
        co.name.clone(),
        co.image.clone(),
        ready,
        state,
        restarts,
        probe(co.liveness_probe).into(),
        probe(co.readiness_probe).into(),
        to_millicore(cpu),
        to_mi(mem),
        rcpu,
        rmem,
        to_age(pod.created_at, now),
    ]
}

/// Requests win over limits; with neither set both columns read `0`.
fn resources(co: &ContainerSpec) -> (String, String) {
    if !co.requests.is_empty() {
        co.requests.columns()
    } else if !co.limits.is_empty() {
        co.limits.columns()
    } else {
        ("0".into(), "0".into())
    }
}

const fn probe(present: bool) -> &'static str {
    if present { "yes" } else { "no" }
}

fn to_millicore(millis: i64) -> String {
    format!("{millis}m")
}

fn to_mi(bytes: i64) -> String {
    format!("{}Mi", bytes / MEGABYTE)
}

fn to_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}
