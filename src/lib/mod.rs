#[macro_use]
extern crate lazy_static;

pub mod cli;
pub mod control;
pub mod helper;
pub mod hud;
pub mod logger;
pub mod sampler;
pub mod server;
pub mod session;
pub mod settings;
pub mod stats;
