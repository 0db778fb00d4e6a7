//! `fileio`: whole‑file helpers plus `open()` returning a closable handle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::rc::Rc;

use log::debug;

use super::{arg, expect_str, table};
use crate::error::{Result, ShravError};
use crate::value::{HostObject, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
    Append,
}

impl Mode {
    fn parse(mode: &Value) -> Result<Mode> {
        match mode {
            Value::Null => Ok(Mode::Read),
            Value::Str(s) => match s.as_str() {
                "r" => Ok(Mode::Read),
                "w" => Ok(Mode::Write),
                "a" => Ok(Mode::Append),
                other => Err(ShravError::Type(format!(
                    "open() mode must be 'r', 'w' or 'a', got '{}'",
                    other
                ))),
            },
            other => Err(ShravError::Type(format!(
                "open() mode must be a string, got {}",
                other.type_name()
            ))),
        }
    }

    fn open(self, path: &str) -> io::Result<File> {
        match self {
            Mode::Read => File::open(path),
            Mode::Write => File::create(path),
            Mode::Append => OpenOptions::new().append(true).create(true).open(path),
        }
    }
}

/// Open file exposed to scripts as `read()`, `write(text)` and `close()`.
#[derive(Debug)]
pub struct FileHandle {
    path: String,
    file: RefCell<Option<File>>,
}

impl FileHandle {
    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> io::Result<T>) -> Result<T> {
        let mut slot = self.file.borrow_mut();
        let file: &mut File = slot.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("I/O operation on closed file '{}'", self.path),
            )
        })?;
        Ok(op(file)?)
    }

    fn read(&self) -> Result<Value> {
        let mut buffer: Vec<u8> = Vec::new();
        self.with_file(|file| file.read_to_end(&mut buffer))?;
        Ok(Value::Str(String::from_utf8(buffer)?))
    }

    fn write(&self, text: &str) -> Result<Value> {
        self.with_file(|file| file.write_all(text.as_bytes()))?;
        Ok(Value::Bool(true))
    }

    /// Idempotent; dropping the `File` flushes and releases it.
    fn close(&self) -> Value {
        if self.file.borrow_mut().take().is_some() {
            debug!("Closed file '{}'", self.path);
        }
        Value::Null
    }

    pub fn is_closed(&self) -> bool {
        self.file.borrow().is_none()
    }
}

impl HostObject for FileHandle {
    fn type_name(&self) -> &str {
        "file"
    }

    fn get_attr(self: Rc<Self>, name: &str) -> Option<Value> {
        let handle: Rc<FileHandle> = Rc::clone(&self);

        match name {
            "read" => Some(Value::native("read", 0, move |_, _| handle.read())),
            "write" => Some(Value::native("write", 1, move |_, args| {
                let text: String = expect_str("write", &arg(args, 0))?;
                handle.write(&text)
            })),
            "close" => Some(Value::native("close", 0, move |_, _| Ok(handle.close()))),
            "path" => Some(Value::Str(self.path.clone())),
            "closed" => Some(Value::Bool(self.is_closed())),
            _ => None,
        }
    }

    fn render(&self) -> String {
        format!("<file '{}'>", self.path)
    }
}

fn open(path: &str, mode: &Value) -> Result<Value> {
    let mode: Mode = Mode::parse(mode)?;
    debug!("Opening '{}' in {:?} mode", path, mode);

    let file: File = mode.open(path)?;
    Ok(Value::Object(Rc::new(FileHandle {
        path: path.to_owned(),
        file: RefCell::new(Some(file)),
    })))
}

fn append(path: &str, text: &str) -> Result<()> {
    let mut file: File = Mode::Append.open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

pub fn functions() -> HashMap<String, Value> {
    table([
        (
            "read",
            Value::native("read", 1, |_, args| {
                let path: String = expect_str("read", &arg(args, 0))?;
                Ok(Value::Str(String::from_utf8(fs::read(path)?)?))
            }),
        ),
        (
            "write",
            Value::native("write", 2, |_, args| {
                let path: String = expect_str("write", &arg(args, 0))?;
                let text: String = expect_str("write", &arg(args, 1))?;
                fs::write(path, text)?;
                Ok(Value::Bool(true))
            }),
        ),
        (
            "append",
            Value::native("append", 2, |_, args| {
                let path: String = expect_str("append", &arg(args, 0))?;
                let text: String = expect_str("append", &arg(args, 1))?;
                append(&path, &text)?;
                Ok(Value::Bool(true))
            }),
        ),
        (
            "exists",
            Value::native("exists", 1, |_, args| {
                let path: String = expect_str("exists", &arg(args, 0))?;
                Ok(Value::Bool(Path::new(&path).exists()))
            }),
        ),
        (
            "delete",
            Value::native("delete", 1, |_, args| {
                let path: String = expect_str("delete", &arg(args, 0))?;
                if !Path::new(&path).exists() {
                    return Ok(Value::Bool(false));
                }
                fs::remove_file(path)?;
                Ok(Value::Bool(true))
            }),
        ),
        (
            "open",
            Value::native("open", 2, |_, args| {
                let path: String = expect_str("open", &arg(args, 0))?;
                open(&path, &arg(args, 1))
            }),
        ),
    ])
}
