#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`LifecycleError`)
//! - [`config`]: Lifecycle configuration (`LifecycleConfig`, builder)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`handle`]: Image handle and its states (`ImageHandle`, `TagSpec`, `HandleState`)
//! - [`target`]: Explicit execution target (`ExecutionTarget`)
//! - [`report`]: Teardown results (`TeardownReport`, `ContainerSweep`)
//! - [`manager`]: Main orchestrator (`ImageLifecycleManager`)
//! - [`exec`]: Command execution against a target (`CommandRunner`)
//!
//! # Architecture
//!
//! ```text
//! ImageLifecycleManager.acquire(version)
//!          |
//!     build_image + tag_image --> ExecutionTarget
//!          |
//!     CommandRunner.run(cmd)  (container derived from the image)
//!          |
//! ImageLifecycleManager.release()
//!          |
//!     sweep derived containers + remove_image --> TeardownReport
//! ```

pub mod config;
pub mod docker;
pub mod error;
pub mod exec;
pub mod handle;
pub mod manager;
pub mod report;
pub mod target;

// --- Public API Re-exports ---

// Manager (main orchestrator)
pub use manager::ImageLifecycleManager;

// Configuration
pub use config::{LifecycleConfig, LifecycleConfigBuilder};

// Error
pub use error::LifecycleError;

// Docker API
pub use docker::{BollardDockerClient, DockerClient};

// Handle and target
pub use handle::{HandleState, ImageHandle, TagSpec};
pub use target::{BackendKind, ExecutionTarget};

// Teardown report
pub use report::{ContainerSweep, ImageRemoval, StepOutcome, SweepOutcome, TeardownReport};

// Execution
pub use exec::{CommandOutput, CommandRunner};
