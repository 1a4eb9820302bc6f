//! skitwriter library crate.
//!
//! Generates short comedic dialogue scripts with Gemini and translates them
//! between Bangla, Hindi and Hinglish. The [`controller`] module owns the
//! session state; everything else feeds it or renders it.

pub mod config;
pub mod controller;
pub mod genai;
pub mod render;
pub mod repl;
pub mod script;
