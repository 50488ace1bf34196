use crate::RuntimeError;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// Runs external commands on behalf of the backends.
///
/// `argv[0]` is the program. On a non-zero exit the error carries the exit
/// status and the combined stdout/stderr output.
pub trait CommandInvoker: Send + Sync {
    fn run(&self, argv: &[String], stdin: Option<&str>) -> Result<String, RuntimeError>;
}

/// Production invoker: spawns the program directly, without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubprocessInvoker;

impl SubprocessInvoker {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn display_command(argv: &[String]) -> String {
    argv.join(" ")
}

impl CommandInvoker for SubprocessInvoker {
    fn run(&self, argv: &[String], stdin: Option<&str>) -> Result<String, RuntimeError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(RuntimeError::ExecFailed("empty command line".to_owned()));
        };
        let command_line = display_command(argv);
        debug!("running: {command_line}");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RuntimeError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        // Stdin is fed concurrently with draining stdout/stderr. A child that
        // exits without reading it is judged by its exit status.
        let pipe = child.stdin.take();
        let output = std::thread::scope(|scope| {
            let writer = match (stdin, pipe) {
                (Some(input), Some(mut pipe)) => {
                    Some(scope.spawn(move || pipe.write_all(input.as_bytes())))
                }
                _ => None,
            };
            let output = child.wait_with_output();
            if let Some(writer) = writer {
                match writer.join() {
                    Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                        debug!("{command_line} closed stdin early");
                    }
                    Ok(Err(e)) => return Err(e),
                    Ok(Ok(())) => {}
                    Err(_) => {
                        return Err(std::io::Error::other("stdin writer thread panicked"));
                    }
                }
            }
            output
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("{command_line} -> {}", output.status);

        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = format!("{stdout}{stderr}").trim().to_owned();
            Err(RuntimeError::CommandFailed {
                command: command_line,
                status: output.status.code(),
                output: combined,
            })
        }
    }
}
