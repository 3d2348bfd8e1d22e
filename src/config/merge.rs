//! Config merge: defaults first, then file and environment overlays.

pub mod service;
