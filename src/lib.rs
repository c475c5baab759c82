pub mod config;
pub mod deps;
pub mod errors;
pub mod host;
pub mod plugin;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod synth;
pub mod types;
