//! Collaborators the interpreter consumes from its host: where `print`
//! output goes and where imported source units come from.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use crate::error::{Result, ShravError};

/// File extension of ShravScript source units.
pub const SOURCE_EXTENSION: &str = "shs";

/// Line sink behind `print`.
pub trait Output {
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Writes to the process's standard output.
#[derive(Debug, Default)]
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", line)?;
        Ok(())
    }
}

/// Collects lines in memory.  Clones share one buffer, so a test can keep a
/// handle while the interpreter owns another.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    lines: Rc<RefCell<Vec<String>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Everything written so far, one `\n`‑terminated line per `print`.
    pub fn contents(&self) -> String {
        self.lines
            .borrow()
            .iter()
            .fold(String::new(), |mut acc, line| {
                acc.push_str(line);
                acc.push('\n');
                acc
            })
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl Output for CapturedOutput {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.lines.borrow_mut().push(line.to_owned());
        Ok(())
    }
}

/// Supplies the text of a user module by name (without extension).
pub trait SourceStore {
    fn read(&self, name: &str) -> Result<String>;
}

/// Reads `<root>/<name>.shs` from disk.
#[derive(Debug, Clone)]
pub struct FsSourceStore {
    root: PathBuf,
}

impl FsSourceStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, SOURCE_EXTENSION))
    }
}

impl Default for FsSourceStore {
    fn default() -> Self {
        Self::new(".")
    }
}

impl SourceStore for FsSourceStore {
    fn read(&self, name: &str) -> Result<String> {
        let path: PathBuf = self.path_for(name);
        debug!("Loading module source from {}", path.display());

        fs::read_to_string(&path).map_err(|e: io::Error| {
            ShravError::Module(format!(
                "Cannot load module '{}' from {}: {}",
                name,
                path.display(),
                e
            ))
        })
    }
}

/// In‑memory source units keyed by module name.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceStore {
    units: HashMap<String, String>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, name: &str, source: &str) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: &str, source: &str) {
        self.units.insert(name.to_owned(), source.to_owned());
    }
}

impl SourceStore for MemorySourceStore {
    fn read(&self, name: &str) -> Result<String> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| ShravError::Module(format!("Module '{}' not found", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_output_clones_share_a_buffer() {
        let captured = CapturedOutput::new();
        let mut writer = captured.clone();

        writer.write_line("one").unwrap();
        writer.write_line("two").unwrap();

        assert_eq!(captured.lines(), vec!["one", "two"]);
        assert_eq!(captured.contents(), "one\ntwo\n");
    }

    #[test]
    fn stores_report_missing_units_as_module_errors() {
        let store = MemorySourceStore::new().with_unit("util", "let x = 1");
        assert_eq!(store.read("util").unwrap(), "let x = 1");
        assert!(matches!(store.read("nope"), Err(ShravError::Module(_))));

        let fs = FsSourceStore::new("/definitely/not/here");
        assert!(fs.path_for("util").ends_with("util.shs"));
        assert!(matches!(fs.read("util"), Err(ShravError::Module(_))));
    }

    #[test]
    fn dotted_module_names_keep_every_segment() {
        let fs = FsSourceStore::new("lib");
        assert_eq!(fs.path_for("util.v2"), Path::new("lib").join("util.v2.shs"));
    }
}
