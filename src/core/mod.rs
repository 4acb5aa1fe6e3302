// src/core/mod.rs

// Everything below is UI-agnostic: the TUI in `ui` only talks to `scanner`
// through `ScanController` and the event channel.

/// Session, stage-result and finding types shared across the crate.
pub mod models;

pub mod error;
pub mod cancel;

/// The event stream a session reports progress through.
pub mod events;

/// The detection catalog and the finding descriptions shown in the UI.
pub mod knowledge_base;

/// Stages, collaborators and the orchestrator.
pub mod scanner;
