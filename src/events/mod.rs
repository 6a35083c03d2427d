//! Messages exchanged between systems and threads.
//!
//! Submodules:
//! - [`audio`] – commands and messages for the background music thread
//! - [`effects`] – sounds and music changes requested by the simulation
pub mod audio;
pub mod effects;
