pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
mod session;
mod state_store;
