//! Native capability modules reachable through `import`.
//!
//! The registry is the interpreter's only door to the host: file access,
//! math and process execution all live behind it so embedders can swap in a
//! sandboxed implementation.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{Result, ShravError};
use crate::value::{Module, Value};

pub mod fileio;
pub mod mathex;
pub mod sysops;

/// Names always resolved by the registry, never from source files.
pub const NATIVE_MODULES: [&str; 4] = ["fileio", "mathex", "sysops", "netgear"];

/// Supplier of native modules.
pub trait ModuleRegistry {
    /// Whether `name` belongs to the native tier.
    fn is_native(&self, name: &str) -> bool;

    /// Build the module named `name`.  Unknown or unavailable modules fail
    /// with [`ShravError::Module`].
    fn load(&self, name: &str) -> Result<Module>;
}

/// Default registry backed by the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeModules;

impl ModuleRegistry for NativeModules {
    fn is_native(&self, name: &str) -> bool {
        NATIVE_MODULES.contains(&name)
    }

    fn load(&self, name: &str) -> Result<Module> {
        debug!("Building native module '{}'", name);

        let functions: HashMap<String, Value> = match name {
            "fileio" => fileio::functions(),
            "mathex" => mathex::functions(),
            "sysops" => sysops::functions(),
            "netgear" => {
                info!("Import of 'netgear' refused: no HTTP support in this build");
                return Err(ShravError::Module(format!(
                    "native module unavailable: '{}'",
                    name
                )));
            }
            _ => {
                return Err(ShravError::Module(format!(
                    "Unknown native module '{}'",
                    name
                )))
            }
        };

        Ok(Module::new(name, functions))
    }
}

/// Build an export table from `(name, native)` pairs.
pub(crate) fn table<I>(entries: I) -> HashMap<String, Value>
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    entries
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
}

/// Positional argument, `null` when absent.
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Null)
}

pub(crate) fn expect_str(function: &str, value: &Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(ShravError::Type(format!(
            "{}() expects a string, got {}",
            function,
            other.type_name()
        ))),
    }
}

pub(crate) fn expect_number(function: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        ShravError::Type(format!(
            "{}() expects a number, got {}",
            function,
            value.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_the_native_tier() {
        let registry = NativeModules;
        for name in NATIVE_MODULES {
            assert!(registry.is_native(name));
        }
        assert!(!registry.is_native("util"));

        let math = registry.load("mathex").unwrap();
        assert_eq!(math.names(), vec!["cos", "pow", "random", "sin", "sqrt", "tan"]);
    }

    #[test]
    fn netgear_is_recognised_but_unavailable() {
        let err = NativeModules.load("netgear").unwrap_err();
        assert!(err.to_string().contains("native module unavailable"));
    }
}
