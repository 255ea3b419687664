pub mod app;
pub mod cli;
pub mod config;
pub mod model;
pub mod output;
pub mod render;
pub mod runner;
pub mod source;

#[cfg(test)]
mod tests;
