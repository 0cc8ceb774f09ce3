mod bootstrap;
mod commands;
mod export;
mod loop_runner;
mod sandbox;
mod world;

pub(crate) use bootstrap::init_tracing;
pub(crate) use loop_runner::{parse_args, run, usage_text};
