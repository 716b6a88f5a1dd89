//! `hrdesk-console` -- drive one details screen from the command line.
//!
//! The binary parses [`cli::Cli`], loads [`config::ConsoleConfig`] from the
//! environment, and runs a [`session`] against the REST API, printing the
//! resulting view model and notifications as JSON.

pub mod cli;
pub mod config;
pub mod session;
