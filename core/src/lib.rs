extern crate self as sopnet_core;

pub mod log;
