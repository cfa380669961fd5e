// Library surface for headless/integration tests and reuse.
// Terminal setup and the CLI live in main.rs.
pub mod angle;
pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod exercise;
pub mod feedback;
pub mod landmark;
pub mod logging;
pub mod rep_counter;
pub mod runtime;
pub mod session;
pub mod source;
pub mod ui;
pub mod util;
