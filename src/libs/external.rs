//! Running external tools with a deadline.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::libs::error::DefragError;

const POLL: Duration = Duration::from_millis(20);

/// Runs `tool` with `args` and returns its standard output.
///
/// A process still running after `timeout` is killed and reported as timed out. A non-zero
/// exit is a failure carrying the tool's standard error. `node_id` names the node the call
/// was made for.
pub fn run(tool: &str, args: &[String], node_id: &str, timeout: Duration) -> Result<String, DefragError> {
    let fail = |cause: String| DefragError::tool(tool, node_id, cause);

    if which::which(tool).is_err() {
        return Err(fail(format!("{} not found in PATH", tool)));
    }

    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| fail(format!("failed to start: {}", e)))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // drain both pipes while waiting so a chatty tool cannot block on a full pipe
    let (status, out, err) = crossbeam::scope(|s| {
        let out = s.spawn(move |_| read_pipe(stdout));
        let err = s.spawn(move |_| read_pipe(stderr));
        let status = wait_with_deadline(&mut child, timeout);
        (status, out.join(), err.join())
    })
    .map_err(|_| fail("output reader panicked".to_string()))?;

    let read = |joined: std::thread::Result<std::io::Result<Vec<u8>>>| match joined {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(fail(format!("failed to read output: {}", e))),
        Err(_) => Err(fail("output reader panicked".to_string())),
    };

    match status {
        Ok(Some(status)) if status.success() => String::from_utf8(read(out)?)
            .map_err(|e| fail(format!("unparseable output: {}", e))),
        Ok(Some(status)) => {
            let err = read(err)?;
            Err(fail(format!("{}: {}", status, String::from_utf8_lossy(&err).trim())))
        }
        Ok(None) => Err(DefragError::timeout(
            tool,
            node_id,
            format!("timed out after {}s", timeout.as_secs_f64()),
        )),
        Err(e) => Err(fail(format!("failed to wait: {}", e))),
    }
}

/// Calls `f`, and once more if the first failure was a timeout.
pub fn retry_once<T, F>(f: F) -> Result<T, DefragError>
where
    F: Fn() -> Result<T, DefragError>,
{
    match f() {
        Err(e) if e.is_transient() => {
            tracing::warn!(error = %e, "retrying after timeout");
            f()
        }
        result => result,
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![];
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

/// `Ok(None)` when the deadline passed and the child was killed.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL);
    }
}
