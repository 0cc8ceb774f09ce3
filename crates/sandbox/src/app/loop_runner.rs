use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use super::bootstrap::build_sandbox;
use super::sandbox::Sandbox;

#[derive(Debug, Default, PartialEq)]
pub(crate) struct RunOptions {
    pub(crate) script: Option<PathBuf>,
    pub(crate) echo: bool,
}

pub(crate) fn usage_text() -> String {
    [
        "usage: sandbox [--script <path>] [--echo]",
        "",
        "Reads sandbox commands from the script, or from stdin when no script is given.",
        "Type 'help' at the prompt for the command list.",
    ]
    .join("\n")
}

/// `Ok(None)` means help was printed and nothing should run.
pub(crate) fn parse_args(args: &[String]) -> Result<Option<RunOptions>, String> {
    let mut options = RunOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(None),
            "--script" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --script".to_string())?;
                options.script = Some(PathBuf::from(value));
                index += 2;
            }
            "--echo" => {
                options.echo = true;
                index += 1;
            }
            other => return Err(format!("unknown argument '{other}'\n{}", usage_text())),
        }
    }
    Ok(Some(options))
}

pub(crate) fn run(options: RunOptions) -> ExitCode {
    let mut sandbox = match build_sandbox() {
        Ok(sandbox) => sandbox,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let result = match &options.script {
        Some(path) => match File::open(path) {
            Ok(file) => {
                info!(path = %path.display(), "script_opened");
                run_lines(&mut sandbox, BufReader::new(file), stdout.lock(), options.echo)
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "script_open_failed");
                return ExitCode::FAILURE;
            }
        },
        None => run_lines(&mut sandbox, io::stdin().lock(), stdout.lock(), options.echo),
    };

    match result {
        Ok(line_count) => {
            info!(line_count, "sandbox_finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "sandbox_io_failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs every line until input ends or a `quit` command. Returns the number
/// of lines read.
pub(crate) fn run_lines<R, W>(
    sandbox: &mut Sandbox,
    reader: R,
    mut writer: W,
    echo: bool,
) -> io::Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut line_count = 0usize;
    for line in reader.lines() {
        let line = line?;
        line_count += 1;
        if echo && !line.trim().is_empty() {
            writeln!(writer, "$ {line}")?;
        }
        let outcome = sandbox.run_line(&line);
        for output in &outcome.lines {
            writeln!(writer, "{output}")?;
        }
        writer.flush()?;
        if outcome.quit {
            break;
        }
    }
    Ok(line_count)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use devtools::{DefDatabase, DevToolsConfig};

    use super::*;
    use crate::app::commands::CommandRegistry;
    use crate::app::world::SandboxWorld;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    fn empty_sandbox() -> Sandbox {
        Sandbox::new(
            CommandRegistry::with_sandbox_builtins().expect("registry"),
            DefDatabase::default(),
            &DevToolsConfig::default(),
            SandboxWorld::new(8, 8),
        )
    }

    #[test]
    fn parses_script_and_echo_flags() {
        assert_eq!(parse_args(&[]).expect("parse"), Some(RunOptions::default()));
        assert_eq!(
            parse_args(&args(&["--echo", "--script", "demo.txt"])).expect("parse"),
            Some(RunOptions {
                script: Some(PathBuf::from("demo.txt")),
                echo: true,
            })
        );
        assert_eq!(parse_args(&args(&["--help"])).expect("parse"), None);
        assert!(parse_args(&args(&["--script"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn stops_at_quit_and_echoes_commands() {
        let mut sandbox = empty_sandbox();
        let input = Cursor::new("# comment\ntick 5\nquit\ntick 1\n");
        let mut output = Vec::new();

        let read = run_lines(&mut sandbox, input, &mut output, true).expect("run");
        assert_eq!(read, 3);
        let text = String::from_utf8(output).expect("utf8");
        assert_eq!(text, "$ # comment\n$ tick 5\ntick = 5\n$ quit\n");
    }
}
