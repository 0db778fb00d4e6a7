pub mod ast;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod modules;
pub mod parser;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;
