//! Bridge between an imaging application's operation registry and a remote
//! scripting host.
//!
//! The crate wires five seams together: the operation catalog ([`registry`]),
//! the host session ([`session`]), per-invocation parameter adaptation
//! ([`adapter`]), command dispatch ([`bridge`]), and stub script generation
//! ([`stubgen`]). [`roi`] carries a small polygon containment shim used for
//! region-valued parameters, and [`cmd`] holds the CLI subcommand
//! implementations.

pub mod adapter;
pub mod bridge;
pub mod cmd;
pub mod registry;
pub mod roi;
pub mod session;
pub mod stubgen;
pub mod utils;
