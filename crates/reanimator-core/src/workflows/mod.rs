//! # Workflows Module
//!
//! High-level entry points that sequence the engine's stages.
//!
//! ## Overview
//!
//! [`reanimate::run`] takes one candidate from validation to a scored,
//! minimized pose. It is the only place where stage order is encoded and the
//! only failure boundary: whatever a stage, collaborator or hook does, the
//! caller receives a [`crate::engine::job::JobOutcome`].

pub mod reanimate;
