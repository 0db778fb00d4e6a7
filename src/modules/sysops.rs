use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::process::{Command, Output};

use log::{debug, info};

use super::{arg, expect_str, table};
use crate::error::{Result, ShravError};
use crate::value::Value;

/// Entry names of a directory, sorted.
fn listdir(path: &str) -> Result<Value> {
    let mut names: Vec<String> = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<_>>()?;
    names.sort();

    Ok(Value::list(names.into_iter().map(Value::Str).collect()))
}

/// Run `command` through the shell and return its stdout.
fn run(command: &str) -> Result<Value> {
    info!("sysops.run: {}", command);
    let output: Output = Command::new("sh").arg("-c").arg(command).output()?;

    if !output.status.success() {
        let code: String = output
            .status
            .code()
            .map_or_else(|| "signal".to_owned(), |c| c.to_string());
        debug!("Command exited with {}", code);

        return Err(ShravError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "command failed (code {}): {}",
                code,
                String::from_utf8_lossy(&output.stderr).trim_end()
            ),
        )));
    }

    Ok(Value::Str(String::from_utf8(output.stdout)?))
}

pub fn functions() -> HashMap<String, Value> {
    table([
        (
            "listdir",
            Value::native("listdir", 1, |_, args| match arg(args, 0) {
                Value::Null => listdir("."),
                path => listdir(&expect_str("listdir", &path)?),
            }),
        ),
        (
            "run",
            Value::native("run", 1, |_, args| {
                run(&expect_str("run", &arg(args, 0))?)
            }),
        ),
        (
            "getenv",
            Value::native("getenv", 1, |_, args| {
                let key: String = expect_str("getenv", &arg(args, 0))?;
                Ok(Value::Str(env::var(key).unwrap_or_default()))
            }),
        ),
    ])
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn run_returns_stdout_and_fails_on_nonzero_exit() {
        match run("echo hi").unwrap() {
            Value::Str(s) => assert_eq!(s, "hi\n"),
            other => panic!("unexpected {:?}", other),
        }

        let err = run("echo oops >&2; exit 3").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("code 3"), "{}", message);
        assert!(message.contains("oops"), "{}", message);
    }
}
