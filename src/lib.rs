//! Driving Safety Simulation Library
//!
//! Autonomous traffic agents on fixed waypoint paths, a player-driven
//! vehicle with an AEB subsystem, and driver reaction analytics.

pub mod simulation;
