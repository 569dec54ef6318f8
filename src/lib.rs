//! Interactive analysis of a CSV dataset by two cooperating language-model agents:
//! one that reads and describes the file, one that answers questions by running
//! generated Python inside a Docker sandbox.

pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod printer;
pub mod sandbox;
pub mod session;
pub mod tools;
