//! A small interactive command interpreter with two interchangeable
//! execution backends.
//!
//! Lines are tokenized with double-quoting and a handful of special
//! characters, sequenced on `;`, and dispatched either to real OS process
//! execution (with `<`/`>` redirection and a two-stage `|` pipeline) or to
//! a sandboxed in-memory filesystem backend for hosts where spawning
//! processes is not possible. The backend is chosen once, when the session
//! is constructed; the router never looks behind the [`command::Backend`]
//! trait again.
//!
//! The main entry point is [`Interpreter`]. Interactive use lives in the
//! binary; embedders call [`Interpreter::run_hosted`] to feed one command
//! line and collect one bounded text response.

pub mod command;
mod builtin;
mod external;
mod io_adapters;
mod lexer;
mod script;
mod vfs;

mod interpreter;

pub use interpreter::Interpreter;
