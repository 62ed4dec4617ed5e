pub mod connection;
pub mod error;
pub mod filters;
pub mod identity;
pub mod parser;
pub mod process;
pub mod scheduler;
pub mod services;
pub mod snapshot;
pub mod source;
pub mod view;
