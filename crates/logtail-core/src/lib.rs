//! Core types and configuration for logtail.
//!
//! This crate provides the tail request model, configuration management,
//! the container view used to describe a pod's containers, and the error
//! types shared across the logtail workspace.

#![warn(missing_docs)]

mod config;
mod container;
mod error;
mod request;

pub use config::{Config, TailConfig};
pub use container::{
    ContainerRow, ContainerSpec, ContainerState, ContainerStatus, ContainerUsage, HEADER,
    MISSING_VALUE, PodView, ResourceList, container_rows,
};
pub use error::{Error, Result};
pub use request::TailRequest;
