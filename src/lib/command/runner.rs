use std::{
    io::{self, ErrorKind},
    process::{ExitStatus, Stdio},
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader},
    process::Command,
};
use tracing::{debug, warn};

use super::types::CommandOutput;
use crate::lib::tasks::store::TaskWriter;

/// Flags whose following value is a secret, with the mask logged in its place.
const SECRET_FLAGS: &[(&str, &str)] = &[
    ("--password", "***"),
    ("--dest-creds", "***:***"),
    ("--src-creds", "***:***"),
    ("--creds", "***:***"),
];

/// Renders an argument vector as one line with every credential masked.
/// Handles both `--flag value` and `--flag=value`.
pub fn redact_command_line(argv: &[String]) -> String {
    let mut parts = Vec::with_capacity(argv.len());
    let mut mask_next: Option<&str> = None;

    for arg in argv {
        if let Some(mask) = mask_next.take() {
            parts.push(mask.to_string());
            continue;
        }

        if let Some((_, mask)) = SECRET_FLAGS.iter().find(|(flag, _)| arg == flag) {
            parts.push(arg.clone());
            mask_next = Some(mask);
            continue;
        }

        let inline = SECRET_FLAGS.iter().find(|(flag, _)| {
            arg.strip_prefix(flag)
                .is_some_and(|rest| rest.starts_with('='))
        });
        match inline {
            Some((flag, mask)) => parts.push(format!("{}={}", flag, mask)),
            None => parts.push(arg.clone()),
        }
    }

    parts.join(" ")
}

/// Runs a command on behalf of a task: the redacted command line and every
/// non-blank output line go to the task log. Spawn and I/O faults are
/// folded into a failed [`CommandOutput`].
pub async fn run_command(
    argv: &[String],
    task: &TaskWriter,
    stdin: Option<&str>,
) -> CommandOutput {
    let command_line = redact_command_line(argv);
    debug!(task_id = %task.task_id(), command = %command_line, "running command");
    task.log(format!("$ {}", command_line)).await;

    match execute(argv, stdin).await {
        Ok((status, output)) => {
            task.log_lines(
                output
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_string),
            )
            .await;

            let success = status.success();
            if !success {
                let code = match status.code() {
                    Some(code) => code.to_string(),
                    None => "none (terminated by signal)".to_string(),
                };
                warn!(
                    task_id = %task.task_id(),
                    command = %command_line,
                    exit_code = %code,
                    "command failed"
                );
                task.log(format!("command failed with exit code {}", code)).await;
            }

            CommandOutput { success, output }
        }
        Err(err) => {
            let program = argv.first().map(String::as_str).unwrap_or("<empty>");
            let message = format!("error executing {}: {}", program, err);
            warn!(task_id = %task.task_id(), error = %err, "failed to execute command");
            task.log(message.clone()).await;
            CommandOutput::failed(message)
        }
    }
}

/// Same process handling as [`run_command`] but nothing reaches the task
/// log. Used for best-effort steps whose failure is expected.
pub async fn run_command_silent(argv: &[String]) -> CommandOutput {
    debug!(command = %redact_command_line(argv), "running silent command");

    match execute(argv, None).await {
        Ok((status, output)) => CommandOutput {
            success: status.success(),
            output,
        },
        Err(err) => CommandOutput::failed(err.to_string()),
    }
}

async fn execute(argv: &[String], stdin: Option<&str>) -> io::Result<(ExitStatus, String)> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "empty command"))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("stderr was not captured"))?;
    let stdin_pipe = child.stdin.take();

    let feed = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, stdin_pipe) {
            let written = match pipe.write_all(input.as_bytes()).await {
                Ok(()) => pipe.shutdown().await,
                Err(err) => Err(err),
            };
            // The child may exit without draining its input.
            match written {
                Err(err) if err.kind() != ErrorKind::BrokenPipe => return Err(err),
                _ => {}
            }
        }
        Ok::<(), io::Error>(())
    };

    let ((), output) = tokio::try_join!(feed, collect_output(stdout, stderr))?;
    let status = child.wait().await?;
    Ok((status, output))
}

/// Reads both streams concurrently, line by line, into one buffer.
async fn collect_output<O, E>(stdout: O, stderr: E) -> io::Result<String>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout = BufReader::new(stdout).split(b'\n');
    let mut stderr = BufReader::new(stderr).split(b'\n');
    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut output = String::new();

    while stdout_open || stderr_open {
        let segment = tokio::select! {
            segment = stdout.next_segment(), if stdout_open => {
                let segment = segment?;
                stdout_open = segment.is_some();
                segment
            }
            segment = stderr.next_segment(), if stderr_open => {
                let segment = segment?;
                stderr_open = segment.is_some();
                segment
            }
        };

        if let Some(bytes) = segment {
            output.push_str(String::from_utf8_lossy(&bytes).trim_end_matches('\r'));
            output.push('\n');
        }
    }

    Ok(output)
}
