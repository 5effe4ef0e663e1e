//! Tail request model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifies the container whose logs should be tailed.
///
/// A request is immutable once issued; the builder methods consume and
/// return it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailRequest {
    /// Namespace the pod lives in.
    pub namespace: String,
    /// Pod (workload) name.
    pub pod: String,
    /// Container name within the pod.
    pub container: String,
    /// Number of trailing lines to fetch before following. `None` means all.
    pub line_limit: Option<u64>,
    /// Tail the previous, terminated instance of the container.
    pub previous: bool,
}

impl TailRequest {
    /// Create a request following the current instance from the start.
    pub fn new(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container: container.into(),
            line_limit: None,
            previous: false,
        }
    }

    /// Only fetch the last `lines` lines before following.
    #[must_use]
    pub fn with_line_limit(mut self, lines: u64) -> Self {
        self.line_limit = Some(lines);
        self
    }

    /// Select the previous instance of the container.
    #[must_use]
    pub fn previous(mut self, previous: bool) -> Self {
        self.previous = previous;
        self
    }

    /// Check that every identifier is present.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("namespace", &self.namespace),
            ("pod", &self.pod),
            ("container", &self.container),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidRequest(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.pod, self.container)?;
        if self.previous {
            write!(f, " (previous)")?;
        }
        Ok(())
    }
}
