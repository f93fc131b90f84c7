extern crate self as collider_core;

pub mod log;
