// dontpad-common: shared types and utilities for the DontPad workspace

pub mod format;
pub mod id;
pub mod pin;
pub mod types;
