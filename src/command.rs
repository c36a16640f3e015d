//! The seam between the command router and an execution backend.

use std::io::Write;

use anyhow::Result;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure,
/// mirroring POSIX shell convention.
pub type ExitCode = i32;

/// One of the two execution backends a session can be built over.
///
/// The router resolves sequencing, history replay, and pipe splitting, then
/// hands token lists across this trait; it never inspects which backend it
/// is talking to. Diagnostics and command output both go to `out`, so a
/// hosted caller capturing the stream sees exactly what an interactive user
/// would.
pub trait Backend {
    /// Execute one tokenized command. Unknown names are reported on `out`
    /// as a diagnostic, not as an `Err`; the session always continues.
    fn run(&mut self, tokens: &[String], out: &mut dyn Write) -> Result<ExitCode>;

    /// Execute a two-stage pipeline from the independently tokenized
    /// halves of the segment.
    fn run_pipeline(
        &mut self,
        left: &[String],
        right: &[String],
        out: &mut dyn Write,
    ) -> Result<ExitCode>;

    /// Change the working directory to `target`.
    fn change_dir(&mut self, target: &str, out: &mut dyn Write) -> Result<ExitCode>;

    /// Print this backend's help text.
    fn print_help(&self, out: &mut dyn Write) -> Result<()>;
}
