extern crate self as omega_core;

pub mod log;
pub mod time;
