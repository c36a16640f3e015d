//! The command router and session state.
//!
//! One [`Interpreter`] is one session: it owns the previous-command
//! buffer, the exit flag, and the execution backend chosen at
//! construction. Routing itself is backend-agnostic: sequencing on `;`,
//! `prev` replay, pipe splitting, and the router-level builtins all happen
//! here, and everything else crosses the [`Backend`] trait.

use std::io::Write;

use anyhow::Result;

use crate::builtin::SandboxBackend;
use crate::command::Backend;
use crate::external::ProcessBackend;
use crate::io_adapters::BoundedWriter;
use crate::lexer;
use crate::script;

/// Size bound of one hosted response, matching the virtual filesystem's
/// content bound.
pub const RESPONSE_LIMIT: usize = 4096;

pub struct Interpreter {
    backend: Box<dyn Backend>,
    /// Last non-`prev` line entered, verbatim. Never holds a line that is
    /// exactly `prev`.
    previous_line: String,
    should_exit: bool,
}

impl Interpreter {
    /// A session executing commands as real OS processes.
    pub fn native() -> Self {
        Self::with_backend(Box::new(ProcessBackend::new()))
    }

    /// A session confined to the in-memory filesystem backend.
    pub fn sandboxed() -> Self {
        Self::with_backend(Box::new(SandboxBackend::new()))
    }

    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Interpreter {
            backend,
            previous_line: String::new(),
            should_exit: false,
        }
    }

    /// Has this session seen `exit` (or an equivalent) and asked its
    /// driver to stop?
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub(crate) fn clear_exit(&mut self) {
        self.should_exit = false;
    }

    /// Route one raw input line: record it, split it on unquoted `;`, and
    /// execute the segments strictly left to right. Each segment completes
    /// (process waits included) before the next starts.
    pub fn interpret_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let line = line.trim_end_matches(['\n', '\r']);

        // Every line that is not itself a `prev` invocation overwrites the
        // buffer before anything runs, empty lines included.
        if line.trim() != "prev" {
            self.previous_line = line.to_string();
        }

        for segment in lexer::split_segments(line) {
            self.route_segment(&segment, out)?;
            if self.should_exit {
                break;
            }
        }
        Ok(())
    }

    /// Run one command file through this session.
    pub fn run_script(&mut self, path: &str, out: &mut dyn Write) -> Result<()> {
        script::run_script(self, path, out)
    }

    /// Entry point for restricted hosts: route one command line and return
    /// everything it printed as one bounded response. Session state (the
    /// filesystem store, directory cells, and previous-command buffer)
    /// carries over between calls; the response buffer does not.
    pub fn run_hosted(&mut self, line: &str) -> String {
        let mut out = BoundedWriter::new(RESPONSE_LIMIT);
        if let Err(e) = self.interpret_line(line, &mut out) {
            let _ = writeln!(out, "{e:#}");
        }
        out.into_string()
    }

    fn route_segment(&mut self, segment: &str, out: &mut dyn Write) -> Result<()> {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        if trimmed == "help" {
            return self.backend.print_help(out);
        }

        if trimmed == "prev" {
            return self.replay_previous(out);
        }

        if let Some(idx) = lexer::find_unquoted_pipe(trimmed) {
            let left = lexer::tokenize(&trimmed[..idx]);
            let right = lexer::tokenize(&trimmed[idx + 1..]);
            if left.is_empty() || right.is_empty() {
                writeln!(out, "Missing command around '|'")?;
                return Ok(());
            }
            self.backend.run_pipeline(&left, &right, out)?;
            return Ok(());
        }

        let tokens = lexer::tokenize(trimmed);
        let Some(first) = tokens.first() else {
            return Ok(());
        };
        match first.as_str() {
            "exit" => {
                writeln!(out, "Bye bye.")?;
                self.should_exit = true;
                Ok(())
            }
            "cd" => match tokens.get(1) {
                Some(target) => {
                    self.backend.change_dir(target, out)?;
                    Ok(())
                }
                None => {
                    writeln!(out, "cd: missing argument")?;
                    Ok(())
                }
            },
            "source" => match tokens.get(1) {
                Some(path) => {
                    let path = path.clone();
                    self.run_script(&path, out)
                }
                None => {
                    writeln!(out, "source: missing file argument")?;
                    Ok(())
                }
            },
            _ => {
                self.backend.run(&tokens, out)?;
                Ok(())
            }
        }
    }

    /// Replay the recorded line, one `;`-segment at a time. The buffer is
    /// taken out of the session for the duration, so a replayed `prev`
    /// finds it empty instead of recursing, and it is restored unchanged
    /// afterwards.
    fn replay_previous(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.previous_line.is_empty() {
            writeln!(out, "No previous command.")?;
            return Ok(());
        }
        let recorded = std::mem::take(&mut self.previous_line);
        for piece in lexer::split_segments(&recorded) {
            self.route_segment(&piece, out)?;
            if self.should_exit {
                break;
            }
        }
        self.previous_line = recorded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_holds_the_last_non_prev_line_verbatim() {
        let mut interp = Interpreter::sandboxed();
        interp.run_hosted("echo hi");
        assert_eq!(interp.previous_line, "echo hi");
        interp.run_hosted("echo hi;echo bye");
        assert_eq!(interp.previous_line, "echo hi;echo bye");
        interp.run_hosted("prev");
        assert_eq!(interp.previous_line, "echo hi;echo bye");
    }

    #[test]
    fn segments_execute_left_to_right() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("echo hi;echo bye"), "hi\nbye\n");
    }

    #[test]
    fn prev_replays_every_segment_in_order() {
        let mut interp = Interpreter::sandboxed();
        interp.run_hosted("echo hi;echo bye");
        assert_eq!(interp.run_hosted("prev"), "hi\nbye\n");
    }

    #[test]
    fn prev_with_nothing_recorded_is_a_diagnostic() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("prev"), "No previous command.\n");
    }

    #[test]
    fn a_replayed_prev_segment_cannot_recurse() {
        let mut interp = Interpreter::sandboxed();
        interp.run_hosted("echo a");
        // The line is recorded before routing, so its own `prev` segment
        // replays the line itself; the nested `prev` piece sees the buffer
        // taken out and replay terminates.
        assert_eq!(
            interp.run_hosted("prev; echo b"),
            "No previous command.\nb\nb\n"
        );
        assert_eq!(interp.run_hosted("prev"), "No previous command.\nb\n");
    }

    #[test]
    fn quoted_semicolons_are_not_sequencing() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("echo \"a;b\""), "a;b\n");
    }

    #[test]
    fn exit_prints_farewell_and_stops_the_segment_chain() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("exit; echo never"), "Bye bye.\n");
        assert!(interp.should_exit());
    }

    #[test]
    fn cd_without_argument_is_a_diagnostic() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("cd"), "cd: missing argument\n");
    }

    #[test]
    fn source_without_argument_is_a_diagnostic() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("source"), "source: missing file argument\n");
    }

    #[test]
    fn help_is_exact_and_backend_supplied() {
        let mut interp = Interpreter::sandboxed();
        let output = interp.run_hosted("help");
        assert!(output.starts_with("Built-in commands:"));
        assert!(output.contains("cd - for previous directory"));
    }

    #[test]
    fn mkdir_cd_pwd_prints_the_joined_path() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("mkdir foo; cd foo; pwd"), "/home/foo\n");
    }

    #[test]
    fn dangling_pipe_is_a_diagnostic() {
        let mut interp = Interpreter::sandboxed();
        assert_eq!(interp.run_hosted("| cat"), "Missing command around '|'\n");
        assert_eq!(interp.run_hosted("echo hi |"), "Missing command around '|'\n");
    }

    #[test]
    fn hosted_responses_are_bounded_and_reset_per_call() {
        let mut interp = Interpreter::sandboxed();
        let big_line = vec!["readme"; 12].join(";");
        let output = interp.run_hosted(&big_line);
        assert_eq!(output.len(), RESPONSE_LIMIT);
        assert_eq!(interp.run_hosted("echo hi"), "hi\n");
    }

    #[test]
    #[cfg(unix)]
    fn native_and_sandbox_help_differ() {
        let mut native = Interpreter::native();
        let mut sandboxed = Interpreter::sandboxed();
        let native_help = native.run_hosted("help");
        let sandbox_help = sandboxed.run_hosted("help");
        assert!(native_help.contains("source <script_file>"));
        assert!(sandbox_help.contains("touch <file>"));
    }

    #[test]
    #[cfg(unix)]
    fn native_pipeline_routes_through_the_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out.txt");
        let mut interp = Interpreter::native();
        let line = format!(
            "sh -c \"printf 'one\\ntwo\\n'\" | cat > {}",
            target.display()
        );
        interp.run_hosted(&line);
        assert_eq!(
            std::fs::read_to_string(&target).expect("read"),
            "one\ntwo\n"
        );
    }
}
