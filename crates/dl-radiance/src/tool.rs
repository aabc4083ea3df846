//! Typed subprocess invocations.

use crate::env::RadianceEnv;
use crate::{RadianceError, RadianceResult};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// One external program call: argument list, working directory and optional stdin.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<Vec<u8>>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(bytes.into());
        self
    }

    /// Human-readable command line for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push_str(&format!("'{arg}'"));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Executes invocations. Implemented by `ProcessRunner` and by test doubles.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &ToolInvocation) -> RadianceResult<ToolOutput>;
}

/// Runs an invocation and turns a non-zero exit status into `ToolFailed`.
pub fn run_checked(
    runner: &dyn ToolRunner,
    invocation: &ToolInvocation,
) -> RadianceResult<ToolOutput> {
    let output = runner.run(invocation)?;
    if !output.success() {
        return Err(RadianceError::ToolFailed {
            tool: invocation.program.clone(),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Runs stages in order, feeding each stage's stdout into the next stage's stdin.
///
/// The first stage keeps its own stdin. Any failing stage stops the pipeline.
pub fn run_pipeline(
    runner: &dyn ToolRunner,
    stages: &[ToolInvocation],
) -> RadianceResult<ToolOutput> {
    let (first, rest) = stages.split_first().ok_or(RadianceError::EmptyPipeline)?;
    let mut output = run_checked(runner, first)?;
    for stage in rest {
        let piped = stage.clone().stdin(std::mem::take(&mut output.stdout));
        output = run_checked(runner, &piped)?;
    }
    Ok(output)
}

/// Spawns real processes with the Radiance environment applied.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    env: RadianceEnv,
}

impl ProcessRunner {
    pub fn new(env: RadianceEnv) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &RadianceEnv {
        &self.env
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> RadianceResult<ToolOutput> {
        let (program, prefix) = self.env.resolve(&invocation.program);
        debug!(command = %invocation.command_line(), "spawning");

        let mut command = Command::new(&program);
        command
            .args(prefix)
            .args(&invocation.args)
            .env("PATH", self.env.path_var())
            .env("RAYPATH", self.env.raypath_var())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RadianceError::ToolNotFound {
                    tool: invocation.program.clone(),
                }
            } else {
                RadianceError::Io(e)
            }
        })?;

        // Feed stdin from a separate thread so a full stdout pipe cannot deadlock us.
        let writer = match (child.stdin.take(), invocation.stdin.clone()) {
            (Some(mut pipe), Some(bytes)) => Some(std::thread::spawn(move || {
                pipe.write_all(&bytes)
            })),
            _ => None,
        };

        let output = child.wait_with_output()?;
        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                // A tool may exit before reading all of its input.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(RadianceError::Io(e)),
                Err(_) => {
                    return Err(RadianceError::Io(std::io::Error::other(
                        "stdin writer thread panicked",
                    )));
                }
            }
        }

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
