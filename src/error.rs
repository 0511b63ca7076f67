/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Syn-Upd-Core error types to provide consistent
    diagnostics and exit semantics.

  Security / Safety Notes:
    Error contexts expose only high-level paths and command
    names; package descriptions are never echoed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate recoverable failures and
    consolidate exit codes for the binary entry point.

  Revision History:
    2025-11-12 COD  Established shared error definitions.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Syn-Upd-Core operations.
pub type Result<T> = std::result::Result<T, SynupdError>;

/// Enumerates high-level error domains surfaced by Syn-Upd-Core.
#[derive(Debug, Error)]
pub enum SynupdError {
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Wire record: {0}")]
    WireFormat(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SynupdError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SynupdError::CommandMissing { .. } => ExitCode::from(10),
            SynupdError::CommandFailure { .. } => ExitCode::from(11),
            SynupdError::Config(_) => ExitCode::from(20),
            SynupdError::Serialization(_) => ExitCode::from(31),
            SynupdError::WireFormat(_) => ExitCode::from(32),
            SynupdError::Filesystem(_) => ExitCode::from(40),
            SynupdError::Runtime(_) => ExitCode::from(50),
            SynupdError::Io(_) => ExitCode::from(41),
        }
    }
}
