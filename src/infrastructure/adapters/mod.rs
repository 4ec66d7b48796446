//! Backend adapters

pub mod console;

pub use console::ConsoleBackend;
