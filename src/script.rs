//! Running command files through the session router.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use anyhow::Result;
use log::debug;

use crate::interpreter::Interpreter;

/// Execute the file at `path` line by line, exactly as if each line had
/// been typed at the prompt. Blank lines are skipped. An `exit` inside the
/// file stops the file, not the session running it.
pub fn run_script(interp: &mut Interpreter, path: &str, out: &mut dyn Write) -> Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            writeln!(out, "source: cannot open {path}: {e}")?;
            return Ok(());
        }
    };

    debug!("running script {path}");
    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                writeln!(out, "source: error reading {path}: {e}")?;
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        interp.interpret_line(&line, out)?;
        if interp.should_exit() {
            interp.clear_exit();
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_script(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("script.txt");
        let mut file = File::create(&path).expect("create script");
        file.write_all(contents.as_bytes()).expect("write script");
        (dir, path.display().to_string())
    }

    #[test]
    fn runs_lines_and_skips_blanks() {
        let (_dir, path) = write_script("mkdir docs\n\ncd docs\npwd\n");
        let mut interp = Interpreter::sandboxed();
        let mut out = Vec::new();
        run_script(&mut interp, &path, &mut out).expect("script");
        assert_eq!(String::from_utf8(out).expect("utf8"), "/home/docs\n");
    }

    #[test]
    fn exit_stops_the_script_but_not_the_session() {
        let (_dir, path) = write_script("pwd\nexit\npwd\n");
        let mut interp = Interpreter::sandboxed();
        let mut out = Vec::new();
        run_script(&mut interp, &path, &mut out).expect("script");
        assert_eq!(String::from_utf8(out).expect("utf8"), "/home\nBye bye.\n");
        assert!(!interp.should_exit());
        assert_eq!(interp.run_hosted("echo still here"), "still here\n");
    }

    #[test]
    fn missing_file_is_a_diagnostic() {
        let mut interp = Interpreter::sandboxed();
        let mut out = Vec::new();
        run_script(&mut interp, "/definitely/not/here.txt", &mut out).expect("script");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("source: cannot open /definitely/not/here.txt:"));
    }

    #[test]
    fn script_lines_share_the_history_buffer() {
        let (_dir, path) = write_script("echo from-script\n");
        let mut interp = Interpreter::sandboxed();
        let mut out = Vec::new();
        run_script(&mut interp, &path, &mut out).expect("script");
        assert_eq!(interp.run_hosted("prev"), "from-script\n");
    }

    #[test]
    fn source_is_routable_from_a_line() {
        let (_dir, path) = write_script("echo nested\n");
        let mut interp = Interpreter::sandboxed();
        let output = interp.run_hosted(&format!("source {path}"));
        assert_eq!(output, "nested\n");
    }
}
