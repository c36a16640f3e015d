use std::io::Write;

use argh::FromArgs;
use minishell::Interpreter;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Upper bound on one line of input, in bytes.
const MAX_LINE_LEN: usize = 4096;

#[derive(FromArgs)]
/// A small interactive command interpreter. Commands run as real OS
/// processes by default, or against a sandboxed in-memory filesystem with
/// --sandbox.
struct ShellArgs {
    /// interpret commands against an in-memory filesystem instead of
    /// spawning processes
    #[argh(switch)]
    sandbox: bool,

    /// script file to execute instead of starting the interactive prompt
    #[argh(positional)]
    script: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: ShellArgs = argh::from_env();

    let mut interpreter = if args.sandbox {
        Interpreter::sandboxed()
    } else {
        Interpreter::native()
    };

    let mut stdout = std::io::stdout();

    if let Some(script) = args.script {
        interpreter.run_script(&script, &mut stdout)?;
        return Ok(());
    }

    if args.sandbox {
        println!("Welcome! Type 'help' to see available commands.");
    } else {
        println!("Welcome to mini-shell.");
    }

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("shell $ ") {
            Ok(line) => {
                if let Err(e) = editor.add_history_entry(line.as_str()) {
                    log::debug!("history entry not recorded: {e}");
                }
                if line.len() > MAX_LINE_LEN {
                    writeln!(stdout, "Input line too long (limit {MAX_LINE_LEN} bytes)")?;
                    continue;
                }
                interpreter.interpret_line(&line, &mut stdout)?;
                stdout.flush()?;
                if interpreter.should_exit() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("Bye bye.");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
