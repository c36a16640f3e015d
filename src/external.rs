//! Real process execution: redirection, spawning, and the two-stage
//! pipeline.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use log::debug;

use crate::command::{Backend, ExitCode};

/// The backend that hands commands to the operating system.
///
/// Each segment runs at most one foreground child (two for a pipeline);
/// the session blocks until they exit. Redirection files are opened in the
/// parent before anything is spawned, then moved into the child's stdio
/// slots, so no descriptor stays open on this side.
pub struct ProcessBackend;

impl ProcessBackend {
    pub fn new() -> Self {
        ProcessBackend
    }
}

impl Default for ProcessBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A token list with the redirection operators stripped out.
#[derive(Debug)]
struct ParsedCommand {
    argv: Vec<String>,
    stdin: Option<String>,
    stdout: Option<String>,
}

/// Strip `<`/`>` and their filenames from a token list; everything else,
/// in original order, becomes argv. Used identically by the single-command
/// and pipeline paths.
fn parse_redirections(tokens: &[String]) -> std::result::Result<ParsedCommand, String> {
    let mut argv = Vec::new();
    let mut stdin = None;
    let mut stdout = None;

    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        match token.as_str() {
            "<" => match iter.next() {
                Some(name) => stdin = Some(name.clone()),
                None => return Err("No input file specified after '<'".to_string()),
            },
            ">" => match iter.next() {
                Some(name) => stdout = Some(name.clone()),
                None => return Err("No output file specified after '>'".to_string()),
            },
            _ => argv.push(token.clone()),
        }
    }

    Ok(ParsedCommand { argv, stdin, stdout })
}

/// Resolve a command name the way a typical shell would: absolute paths
/// and paths with a separator are checked directly, single components are
/// searched through `PATH`.
fn resolve_program(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() || name.contains('/') {
        return path.exists().then(|| path.to_path_buf());
    }
    let search = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&search) {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Open both redirection files, or report why the command must be
/// abandoned before any spawn.
fn open_redirections(
    parsed: &ParsedCommand,
    out: &mut dyn Write,
) -> Result<Option<(Option<File>, Option<File>)>> {
    let stdin = match &parsed.stdin {
        Some(path) => match File::open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                writeln!(out, "Failed to open input file: {e}")?;
                return Ok(None);
            }
        },
        None => None,
    };
    let stdout = match &parsed.stdout {
        Some(path) => match File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                writeln!(out, "Failed to open output file: {e}")?;
                return Ok(None);
            }
        },
        None => None,
    };
    Ok(Some((stdin, stdout)))
}

/// Parse, resolve, and open everything one pipeline half needs.
fn prepare_half(
    tokens: &[String],
    out: &mut dyn Write,
) -> Result<Option<(PathBuf, ParsedCommand, Option<File>, Option<File>)>> {
    let parsed = match parse_redirections(tokens) {
        Ok(parsed) => parsed,
        Err(message) => {
            writeln!(out, "{message}")?;
            return Ok(None);
        }
    };
    if parsed.argv.is_empty() {
        writeln!(out, "Missing command name")?;
        return Ok(None);
    }
    let Some(program) = resolve_program(&parsed.argv[0]) else {
        writeln!(out, "{}: command not found", parsed.argv[0])?;
        return Ok(None);
    };
    let Some((stdin, stdout)) = open_redirections(&parsed, out)? else {
        return Ok(None);
    };
    Ok(Some((program, parsed, stdin, stdout)))
}

#[cfg(unix)]
fn status_code(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => match status.signal() {
            Some(signal) => 128 + signal,
            None => -1,
        },
    }
}

#[cfg(not(unix))]
fn status_code(status: ExitStatus) -> ExitCode {
    status.code().unwrap_or(-1)
}

impl Backend for ProcessBackend {
    fn run(&mut self, tokens: &[String], out: &mut dyn Write) -> Result<ExitCode> {
        let Some((program, parsed, stdin, stdout)) = prepare_half(tokens, out)? else {
            return Ok(1);
        };

        let mut command = Command::new(&program);
        command.args(&parsed.argv[1..]);
        if let Some(file) = stdin {
            command.stdin(Stdio::from(file));
        }
        if let Some(file) = stdout {
            command.stdout(Stdio::from(file));
        }

        debug!("spawning {:?}", parsed.argv);
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                writeln!(out, "Failed to execute {}: {e}", parsed.argv[0])?;
                return Ok(1);
            }
        };
        let status = child.wait().context("waiting for child process")?;
        debug!("{} exited with {status}", parsed.argv[0]);
        Ok(status_code(status))
    }

    fn run_pipeline(
        &mut self,
        left: &[String],
        right: &[String],
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        // Everything either side needs is parsed, resolved, and opened
        // before the first spawn; a failure on either half abandons the
        // whole pipeline.
        let Some((left_program, left_parsed, left_in, left_out)) = prepare_half(left, out)? else {
            return Ok(1);
        };
        let Some((right_program, right_parsed, right_in, right_out)) = prepare_half(right, out)?
        else {
            return Ok(1);
        };

        let mut left_cmd = Command::new(&left_program);
        left_cmd.args(&left_parsed.argv[1..]);
        if let Some(file) = left_in {
            left_cmd.stdin(Stdio::from(file));
        }
        // An explicit `>` on the left half wins over the pipe; the right
        // side then reads immediate end-of-file.
        match left_out {
            Some(file) => left_cmd.stdout(Stdio::from(file)),
            None => left_cmd.stdout(Stdio::piped()),
        };

        debug!("spawning pipeline {:?} | {:?}", left_parsed.argv, right_parsed.argv);
        let mut left_child = match left_cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                writeln!(out, "Failed to execute {}: {e}", left_parsed.argv[0])?;
                return Ok(1);
            }
        };

        let mut right_cmd = Command::new(&right_program);
        right_cmd.args(&right_parsed.argv[1..]);
        if let Some(file) = right_in {
            right_cmd.stdin(Stdio::from(file));
        } else if let Some(pipe) = left_child.stdout.take() {
            right_cmd.stdin(Stdio::from(pipe));
        } else {
            right_cmd.stdin(Stdio::null());
        }
        if let Some(file) = right_out {
            right_cmd.stdout(Stdio::from(file));
        }

        let mut right_child = match right_cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                writeln!(out, "Failed to execute {}: {e}", right_parsed.argv[0])?;
                let _ = left_child.wait();
                return Ok(1);
            }
        };

        // The children now hold the only pipe ends; dropping any leftover
        // parent copy lets a writer see a closed pipe instead of blocking
        // forever.
        drop(left_child.stdout.take());

        let left_status = left_child.wait().context("waiting for pipeline writer")?;
        let right_status = right_child.wait().context("waiting for pipeline reader")?;
        debug!("pipeline exited with {left_status} / {right_status}");
        Ok(status_code(right_status))
    }

    fn change_dir(&mut self, target: &str, out: &mut dyn Write) -> Result<ExitCode> {
        if let Err(e) = std::env::set_current_dir(target) {
            writeln!(out, "cd failed: {e}")?;
            return Ok(1);
        }
        Ok(0)
    }

    fn print_help(&self, out: &mut dyn Write) -> Result<()> {
        write!(out, "{HELP_TEXT}")?;
        Ok(())
    }
}

const HELP_TEXT: &str = "Built-in commands:\n\
    1. cd <directory>\n   Change the current directory to <directory>.\n   Usage: cd /path/to/directory\n\n\
    2. exit\n   Exit the shell.\n   Usage: exit\n\n\
    3. source <script_file>\n   Execute commands from a file as if they were entered at the command line.\n   Usage: source script.txt\n\n\
    4. prev\n   Re-execute the last command entered.\n   Usage: prev\n\n\
    5. help\n   Display this help information.\n   Usage: help\n";
