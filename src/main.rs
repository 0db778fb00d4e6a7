use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use shrav::ast::Program;
use shrav::error::ShravError;
use shrav::interpreter::{Interpreter, InterpreterConfig};
use shrav::parser::Parser;
use shrav::scanner::Scanner;
use shrav::token::Token;
use shrav::value::Value;

/// Exit status for lexical and grammar errors.
const EXIT_COMPILE_ERROR: i32 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "ShravScript interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a source file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a source file and prints its AST as JSON
    Parse { filename: PathBuf },

    /// Runs a ShravScript program
    Run { filename: PathBuf },

    /// Starts an interactive shell
    Repl,
}

/// Reads a source file into a String
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("shrav::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn exit_code(err: &ShravError) -> i32 {
    if err.is_compile_error() {
        EXIT_COMPILE_ERROR
    } else {
        EXIT_RUNTIME_ERROR
    }
}

fn tokenize(filename: &Path) -> Result<()> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_COMPILE_ERROR);
        std::process::exit(EXIT_COMPILE_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;

    let parsed: shrav::error::Result<Program> = Scanner::new(&source)
        .collect::<shrav::error::Result<Vec<Token<'_>>>>()
        .and_then(|tokens| Parser::new(&tokens).parse());

    match parsed {
        Ok(program) => {
            let json = serde_json::to_string_pretty(&program).context("Failed to serialize AST")?;
            println!("{}", json);
        }

        Err(e) => {
            debug!("Parse debug: {}", e);
            eprintln!("{}", e);
            std::process::exit(EXIT_COMPILE_ERROR);
        }
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn run(filename: &Path) -> Result<()> {
    info!("Running Run subcommand");
    let source = read_file(filename)?;

    let root = filename
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut interpreter = Interpreter::with_config(InterpreterConfig::default().with_module_root(root));

    if let Err(e) = interpreter.run_source(&source) {
        debug!("Runtime debug: {}", e);
        eprintln!("{}", e);
        std::process::exit(exit_code(&e));
    }

    info!("Program executed successfully");
    Ok(())
}

/// Net `{` minus `}` outside string literals and comments; the REPL keeps
/// reading continuation lines while this is positive.
fn open_braces(text: &str) -> i64 {
    let mut depth: i64 = 0;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            (None, '{') => depth += 1,
            (None, '}') => depth -= 1,
            (None, _) => {}
        }
    }

    depth
}

fn repl() -> Result<()> {
    info!("Starting REPL");
    println!("ShravScript REPL (Interactive Shell)");
    println!("Type 'exit()' to exit");
    println!();

    let mut interpreter = Interpreter::with_config(InterpreterConfig::default());
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("shs> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let mut input: String = line?;

        if input.trim() == "exit()" {
            break;
        }

        while open_braces(&input) > 0 {
            print!(".... ");
            io::stdout().flush()?;

            match lines.next() {
                Some(line) => {
                    input.push('\n');
                    input.push_str(&line?);
                }
                None => break,
            }
        }

        match interpreter.run_source(&input) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{}", interpreter.stringify(&value)),
            Err(e) => println!("Error: {}", e),
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename } => tokenize(filename),
        Commands::Parse { filename } => parse(filename),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_balance_ignores_strings_and_comments() {
        assert_eq!(open_braces("fn f() {"), 1);
        assert_eq!(open_braces("let s = \"{\" # {"), 0);
        assert_eq!(open_braces("if x { print '}' }"), 0);
    }
}
