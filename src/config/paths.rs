//! Config file locations.

pub mod xdg_root;
