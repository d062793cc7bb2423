//! Workspace-facing service layer.

pub mod thought_service;

pub use thought_service::{CaptureInput, ServiceError, ServiceResult, ThoughtService};
