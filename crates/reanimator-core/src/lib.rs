//! # Reanimator Core Library
//!
//! Orchestration of fragment-based ligand placement: a candidate molecule,
//! a set of reference fragments ("hits") and a receptor go in; a restrained,
//! minimized and scored pose plus a trail of per-job artifacts come out.
//!
//! ## Architectural Philosophy
//!
//! The chemistry itself (parameterization, fragment merging, minimization,
//! deviation measurement) is supplied by external collaborators. This library
//! owns the control flow, the data contracts between those collaborators, and
//! failure containment. It is layered so that each concern can be tested alone:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `ResidueLocator`),
//!   PDB and molfile I/O, connectivity-string parsing, and the warhead/residue catalog.
//!
//! - **[`engine`]: The Stages.** One component per pipeline step (validation, covalent
//!   resolution, restraints, spatial merging, checkpoints, minimization hand-off, scoring),
//!   the collaborator traits, job state and the error taxonomy.
//!
//! - **[`workflows`]: The Public API.** `workflows::reanimate::run` sequences the stages
//!   for one job and turns every fault into a `JobOutcome` instead of a crash.

pub mod core;
pub mod engine;
pub mod workflows;
