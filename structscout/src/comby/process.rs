//! Running comby with its pipes wired up.
//!
//! [`run_with_pipes`] is the one place a matcher process is started. It owns
//! the child and runs up to three scoped threads around it: an optional writer
//! that owns stdin, a reader that owns stdout and hands every output line to a
//! callback, and a drain for stderr. The calling thread supervises the child,
//! killing it on cancellation, and joins every thread before returning.
//!
//! comby forks worker processes that inherit its pipes. On Unix the child is
//! started in a process group of its own and cancellation kills the whole
//! group, so no worker can hold stdout open after the search has stopped.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::protocol::{self, FileMatch};
use super::{Args, Input};
use crate::cancel::Cancellation;
use crate::errors::{SearchError, SearchResult};

const STDOUT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Starts comby with `args` and drives it to completion.
///
/// `write_input`, when given, receives the child's stdin and a flag that is set
/// once the child has exited; stdin is closed when it returns. `on_line` is
/// called with every non-empty stdout line (without the newline) in the order
/// comby printed them. Lines are read into a growing buffer, so arbitrarily
/// long records are fine.
pub fn run_with_pipes<W, R>(
    comby_path: &Path,
    args: &Args,
    cancel: &Cancellation,
    poll_interval: Duration,
    write_input: Option<W>,
    mut on_line: R,
) -> SearchResult<()>
where
    W: FnOnce(ChildStdin, &AtomicBool) + Send,
    R: FnMut(&[u8]) + Send,
{
    let command_args = args.to_command_args();
    debug!(
        "Running {} with {} input: {:?}",
        comby_path.display(),
        args.input.kind(),
        command_args
    );

    let mut command = Command::new(comby_path);
    command
        .args(&command_args)
        .stdin(if write_input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command
        .spawn()
        .map_err(|e| SearchError::spawn(comby_path.display().to_string(), e))?;

    let stdin = child.stdin.take();
    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => (stdout, stderr),
        (stdout, _) => {
            kill(&mut child);
            return Err(SearchError::Pipe(if stdout.is_none() {
                "stdout"
            } else {
                "stderr"
            }));
        }
    };
    let stdin = match (write_input, stdin) {
        (Some(write_input), Some(stdin)) => Some((write_input, stdin)),
        (Some(_), None) => {
            kill(&mut child);
            return Err(SearchError::Pipe("stdin"));
        }
        (None, _) => None,
    };

    let exited = AtomicBool::new(false);

    let (status, stderr_text) = thread::scope(|s| {
        let writer = stdin.map(|(write_input, stdin)| {
            let exited = &exited;
            s.spawn(move || write_input(stdin, exited))
        });

        let reader = s.spawn(move || {
            let mut reader = BufReader::with_capacity(STDOUT_BUFFER_CAPACITY, stdout);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = trim_newline(&line);
                        if !trimmed.is_empty() {
                            on_line(trimmed);
                        }
                    }
                    Err(e) => {
                        warn!("Error reading matcher output, stopping: {}", e);
                        break;
                    }
                }
            }
        });

        let stderr_drain = s.spawn(move || {
            let mut text = String::new();
            let mut stderr = stderr;
            if let Err(e) = stderr.read_to_string(&mut text) {
                debug!("Error reading matcher stderr: {}", e);
            }
            text
        });

        let status = wait_for_exit(&mut child, cancel, poll_interval);
        exited.store(true, Ordering::Relaxed);

        // Workers that outlive comby keep the output pipes open.
        let mut group_killed = false;
        while !(reader.is_finished() && stderr_drain.is_finished()) {
            if cancel.is_cancelled() && !group_killed {
                kill_process_group(&child);
                group_killed = true;
            }
            thread::sleep(poll_interval);
        }

        if let Some(writer) = writer {
            if writer.join().is_err() {
                warn!("Matcher input writer panicked");
            }
        }
        if reader.join().is_err() {
            warn!("Matcher output reader panicked");
        }
        let stderr_text = stderr_drain.join().unwrap_or_default();
        (status, stderr_text)
    });

    let status = status?;
    if cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
    }
    if !status.success() {
        return Err(SearchError::matcher_failed(status, stderr_text.trim()));
    }
    Ok(())
}

/// Runs comby to completion and collects every `-match-only` record.
///
/// Unparsable lines are logged and skipped. Streamed tar input is rejected:
/// comby answers it with chunk records, which is what the streaming driver
/// reads instead.
pub fn matches(
    comby_path: &Path,
    args: &Args,
    cancel: &Cancellation,
    poll_interval: Duration,
) -> SearchResult<Vec<FileMatch>> {
    let mut records = Vec::new();
    let collect = |line: &[u8]| match protocol::parse_file_match(line) {
        Ok(record) => records.push(record),
        Err(e) => warn!(
            "Skipping unparsable matcher output line ({}): {}",
            e,
            String::from_utf8_lossy(line)
        ),
    };

    match &args.input {
        Input::FileContent(content) => {
            let write_content = |mut stdin: ChildStdin, _: &AtomicBool| {
                use std::io::Write;
                if let Err(e) = stdin.write_all(content) {
                    warn!("Failed to write file content to matcher: {}", e);
                }
            };
            run_with_pipes(
                comby_path,
                args,
                cancel,
                poll_interval,
                Some(write_content),
                collect,
            )?;
        }
        Input::ZipPath(_) | Input::DirPath(_) => {
            run_with_pipes(
                comby_path,
                args,
                cancel,
                poll_interval,
                None::<fn(ChildStdin, &AtomicBool)>,
                collect,
            )?;
        }
        Input::Tar(_) => {
            return Err(SearchError::config_error(
                "tar input produces chunk records; collect it with the streaming driver",
            ))
        }
    }

    Ok(records)
}

/// Waits for the child to exit, killing it if the search is cancelled first
fn wait_for_exit(
    child: &mut Child,
    cancel: &Cancellation,
    poll_interval: Duration,
) -> SearchResult<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_cancelled() {
            debug!("Search cancelled, killing matcher process {}", child.id());
            kill_process_group(child);
            let _ = child.kill();
            return Ok(child.wait()?);
        }
        thread::sleep(poll_interval);
    }
}

fn kill(child: &mut Child) {
    kill_process_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// Sends SIGKILL to the process group the child leads
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a negative pid names the group
    // created for this child at spawn.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        debug!(
            "Failed to kill matcher process group {}: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
