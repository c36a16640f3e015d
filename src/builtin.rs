//! Builtin commands of the sandboxed backend.
//!
//! Every command here runs in-process against the in-memory filesystem;
//! nothing ever spawns. Builtins are parsed with [`argh`] (`FromArgs`) and
//! write their output, diagnostics included, to the stream supplied by
//! the router, so hosted callers capture exactly what a terminal would
//! show.

use std::io::Write;

use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use chrono::Local;

use crate::command::{Backend, ExitCode};
use crate::vfs::{self, VfsState};

/// ctime-style timestamp used by `ls -l` and `date`.
const TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// The process-free execution backend over the in-memory filesystem.
pub struct SandboxBackend {
    state: VfsState,
}

impl SandboxBackend {
    pub fn new() -> Self {
        SandboxBackend {
            state: VfsState::new(),
        }
    }
}

impl Default for SandboxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SandboxBackend {
    fn run(&mut self, tokens: &[String], out: &mut dyn Write) -> Result<ExitCode> {
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(0);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        match name.as_str() {
            "ls" => run_parsed::<Ls>(&args, &mut self.state, out),
            "pwd" => run_parsed::<Pwd>(&args, &mut self.state, out),
            "echo" => run_parsed::<Echo>(&args, &mut self.state, out),
            "cat" => run_parsed::<Cat>(&args, &mut self.state, out),
            "touch" => run_parsed::<Touch>(&args, &mut self.state, out),
            "mkdir" => run_parsed::<Mkdir>(&args, &mut self.state, out),
            "rm" => run_parsed::<Rm>(&args, &mut self.state, out),
            "date" => run_parsed::<Date>(&args, &mut self.state, out),
            "whoami" => run_parsed::<Whoami>(&args, &mut self.state, out),
            "clear" => run_parsed::<Clear>(&args, &mut self.state, out),
            "readme" => run_parsed::<Readme>(&args, &mut self.state, out),
            // Extra arguments after `help` are ignored.
            "help" => {
                write!(out, "{HELP_TEXT}")?;
                Ok(0)
            }
            _ => {
                writeln!(out, "Unknown command: {name}")?;
                writeln!(out, "Type 'help' for a list of commands")?;
                Ok(1)
            }
        }
    }

    fn run_pipeline(
        &mut self,
        _left: &[String],
        _right: &[String],
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        writeln!(out, "Pipelines are not supported in this session")?;
        Ok(1)
    }

    fn change_dir(&mut self, target: &str, out: &mut dyn Write) -> Result<ExitCode> {
        let state = &mut self.state;
        if target == "-" {
            std::mem::swap(&mut state.current_dir, &mut state.previous_dir);
            return Ok(0);
        }
        if target == ".." {
            let parent =
                vfs::parent_of(&state.current_dir).unwrap_or_else(|| vfs::ROOT.to_string());
            state.previous_dir = std::mem::replace(&mut state.current_dir, parent);
            return Ok(0);
        }
        let full = state.resolve(target);
        let is_directory = state.entry(&full).is_some_and(|entry| entry.is_dir);
        if !is_directory {
            writeln!(out, "cd: {target}: No such directory")?;
            return Ok(1);
        }
        state.previous_dir = std::mem::replace(&mut state.current_dir, full);
        Ok(0)
    }

    fn print_help(&self, out: &mut dyn Write) -> Result<()> {
        write!(out, "{HELP_TEXT}")?;
        Ok(())
    }
}

/// A builtin of the sandboxed backend.
///
/// Implementors are argh argument structs; `run` consumes the parsed
/// invocation and operates on the filesystem state.
trait VfsBuiltin: Sized + FromArgs {
    /// Canonical command name, e.g. "ls".
    fn name() -> &'static str;

    fn run(self, state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode>;
}

/// Parse `args` for builtin `T` and run it. Parse failures are written to
/// `out` as diagnostics; they never escalate past the command.
fn run_parsed<T: VfsBuiltin>(
    args: &[&str],
    state: &mut VfsState,
    out: &mut dyn Write,
) -> Result<ExitCode> {
    match T::from_args(&[T::name()], args) {
        Ok(cmd) => cmd.run(state, out),
        Err(EarlyExit { output, status }) => {
            writeln!(out, "{}", output.trim_end())?;
            Ok(if status.is_err() { 1 } else { 0 })
        }
    }
}

#[derive(FromArgs)]
/// List files in the current directory.
struct Ls {
    /// show in long format with details
    #[argh(switch, short = 'l')]
    long: bool,
}

impl VfsBuiltin for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn run(self, state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        let listing = state.list_current();
        if self.long {
            writeln!(out, "total {}", state.len())?;
        }
        for (name, entry) in listing {
            if self.long {
                let mode = if entry.is_dir { "drwxr-xr-x" } else { "-rw-r--r--" };
                writeln!(
                    out,
                    "{}  -  guest  guest  {}  {}",
                    mode,
                    entry.modified.format(TIME_FORMAT),
                    name
                )?;
            } else {
                writeln!(out, "{name}")?;
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory.
struct Pwd {}

impl VfsBuiltin for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn run(self, state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        writeln!(out, "{}", state.current_dir)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print text to the terminal, space-separated and newline-terminated.
struct Echo {
    /// values to print as-is
    #[argh(positional, greedy)]
    args: Vec<String>,
}

impl VfsBuiltin for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn run(self, _state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        writeln!(out, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Display contents of a file.
struct Cat {
    /// file to display
    #[argh(positional)]
    name: Option<String>,
}

impl Cat {
    fn print_content(content: &str, out: &mut dyn Write) -> Result<ExitCode> {
        write!(out, "{content}")?;
        if !content.is_empty() {
            writeln!(out)?;
        }
        Ok(0)
    }
}

impl VfsBuiltin for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn run(self, state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        let Some(name) = self.name else {
            writeln!(out, "cat: missing file operand")?;
            return Ok(1);
        };

        // "readme" and friends resolve to the seeded README while in the
        // home directory, whatever their case.
        let lowered = name.to_ascii_lowercase();
        if matches!(lowered.as_str(), "readme" | "readme.md" | "readme.txt")
            && state.current_dir == vfs::HOME
        {
            if let Some(entry) = state.entry("/home/README.md") {
                return Self::print_content(&entry.content, out);
            }
        }

        let full = state.resolve(&name);
        if let Some(entry) = state.entry(&full) {
            if !entry.is_dir {
                return Self::print_content(&entry.content, out);
            }
        }

        // Extensionless names get one retry with `.md` appended.
        if !name.contains('.') {
            let with_ext = format!("{full}.md");
            if let Some(entry) = state.entry(&with_ext) {
                if !entry.is_dir {
                    return Self::print_content(&entry.content, out);
                }
            }
        }

        writeln!(out, "cat: {name}: No such file")?;
        Ok(1)
    }
}

#[derive(FromArgs)]
/// Create a new empty file, or refresh an existing file's timestamp.
struct Touch {
    /// file to create or refresh
    #[argh(positional)]
    name: Option<String>,
}

impl VfsBuiltin for Touch {
    fn name() -> &'static str {
        "touch"
    }

    fn run(self, state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        let Some(name) = self.name else {
            writeln!(out, "touch: missing file operand")?;
            return Ok(1);
        };
        let full = state.resolve(&name);
        if let Some(entry) = state.entry_mut(&full) {
            entry.modified = Local::now();
            return Ok(0);
        }
        if !state.insert(full, false, "") {
            writeln!(out, "touch: cannot create file '{name}': Filesystem full")?;
            return Ok(1);
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create a new directory.
struct Mkdir {
    /// directory to create
    #[argh(positional)]
    name: Option<String>,
}

impl VfsBuiltin for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn run(self, state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        let Some(name) = self.name else {
            writeln!(out, "mkdir: missing operand")?;
            return Ok(1);
        };
        let full = state.resolve(&name);
        if state.entry(&full).is_some() {
            writeln!(out, "mkdir: cannot create directory '{name}': File exists")?;
            return Ok(1);
        }
        if !state.insert(full, true, "") {
            writeln!(out, "mkdir: cannot create directory '{name}': Filesystem full")?;
            return Ok(1);
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove a file or directory.
struct Rm {
    /// entry to remove
    #[argh(positional)]
    name: Option<String>,
}

impl VfsBuiltin for Rm {
    fn name() -> &'static str {
        "rm"
    }

    fn run(self, state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        let Some(name) = self.name else {
            writeln!(out, "rm: missing operand")?;
            return Ok(1);
        };
        let full = state.resolve(&name);
        if !state.remove(&full) {
            writeln!(out, "rm: cannot remove '{name}': No such file or directory")?;
            return Ok(1);
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Display the current date and time.
struct Date {}

impl VfsBuiltin for Date {
    fn name() -> &'static str {
        "date"
    }

    fn run(self, _state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        writeln!(out, "{}", Local::now().format(TIME_FORMAT))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Display the current user.
struct Whoami {}

impl VfsBuiltin for Whoami {
    fn name() -> &'static str {
        "whoami"
    }

    fn run(self, _state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        writeln!(out, "guest")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Clear the terminal screen.
struct Clear {}

impl VfsBuiltin for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn run(self, _state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        write!(out, "\x1b[2J\x1b[H")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Show the command list.
struct Readme {}

impl VfsBuiltin for Readme {
    fn name() -> &'static str {
        "readme"
    }

    fn run(self, _state: &mut VfsState, out: &mut dyn Write) -> Result<ExitCode> {
        write!(out, "{}", vfs::README_CONTENT)?;
        Ok(0)
    }
}

const HELP_TEXT: &str = "Built-in commands:\n\
    1. ls [-l]\n   List files in the current directory.\n   -l: show in long format with details\n\n\
    2. cd <directory>\n   Change the current directory.\n   Usage: cd <path> or cd - for previous directory\n\n\
    3. pwd\n   Print working directory.\n   Usage: pwd\n\n\
    4. echo <text>\n   Print text to the terminal.\n   Usage: echo Hello World\n\n\
    5. cat <file>\n   Display contents of a file.\n   Usage: cat file.txt\n\n\
    6. touch <file>\n   Create a new empty file.\n   Usage: touch file.txt\n\n\
    7. mkdir <directory>\n   Create a new directory.\n   Usage: mkdir mydir\n\n\
    8. rm <file/directory>\n   Remove a file or directory.\n   Usage: rm file.txt\n\n\
    9. date\n   Display current date and time.\n   Usage: date\n\n\
    10. whoami\n    Display current user.\n    Usage: whoami\n\n\
    11. clear\n    Clear the terminal screen.\n    Usage: clear\n\n\
    12. help\n    Display this help information.\n    Usage: help\n";
