// src/ui/widgets/mod.rs

pub mod disclaimer_popup; // Authorised-use notice shown at startup.
pub mod findings_view;    // Findings list with per-category details.
pub mod footer;           // Key hints for the current state.
pub mod input;            // Target input box.
pub mod log_view;         // Session log events.
pub mod summary;          // Stage, recon results and finding counts.
