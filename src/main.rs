//! gtfmt CLI
//!
//! Usage:
//!   gtfmt [OPTIONS] [FILES]...
//!
//! Options:
//!   -r, --rewrite <RULE>  Rewrite rule, e.g. '.Index.Foo -> .Index.Baz.Foo'
//!   -l, --list            List what would change without writing anything
//!   -h, --help            Print help
//!
//! Reformats one or more templates in place. If not given a filename,
//! reads from stdin and writes to stdout.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gtfmt::{fix, format, formatted, Error};

const REWRITE_HELP: &str = "Rewrite rules:
  * Replace all or part of a path with another path:
      .Index.Foo -> .Index.Baz.Foo
    The paths must start with a \".\". Matching is case sensitive, on
    full segments only.

  * Replace a function with another function:
      foo -> bar
    The lack of a \".\" indicates a function replacement.";

#[derive(Parser)]
#[command(name = "gtfmt")]
#[command(about = "Formats and rewrites the code inside Go-style template actions")]
#[command(after_help = REWRITE_HELP)]
struct Cli {
    /// Template files (reads from stdin if none are given)
    files: Vec<PathBuf>,

    /// Rewrite rule, e.g. '.Index.Foo -> .Index.Baz.Foo'
    #[arg(short, long, value_name = "RULE")]
    rewrite: Option<String>,

    /// List what would change without writing anything
    #[arg(short, long)]
    list: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let rule = match cli.rewrite.as_deref().map(split_rule).transpose() {
        Ok(rule) => rule,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(1);
        }
    };

    let outcome = if cli.files.is_empty() {
        run_stdin(rule.as_ref(), cli.list)
    } else {
        run_files(&cli.files, rule.as_ref(), cli.list)
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::from(1),
    }
}

/// Split a `orig -> repl` rewrite rule
fn split_rule(spec: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = spec.split(" -> ").collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err("rewrite rule must be in the format 'foo -> bar'".to_string());
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

fn process(name: &str, source: &str, rule: Option<&(String, String)>) -> Result<String, Error> {
    match rule {
        Some((orig, repl)) => fix(name, source, orig, repl),
        None => format(name, source),
    }
}

fn report(err: &Error, name: &str, source: &str) {
    match err {
        Error::Parse(parse) => eprintln!("{}", parse.format(source, name)),
        other => eprintln!("Error: {}", other),
    }
}

fn run_stdin(rule: Option<&(String, String)>, list: bool) -> Result<(), ()> {
    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        eprintln!("Error reading from stdin: {}", e);
        return Err(());
    }

    if list && rule.is_none() {
        match formatted("stdin", &source) {
            Ok(true) => println!("formatted"),
            Ok(false) => println!("unformatted"),
            Err(e) => {
                report(&e, "stdin", &source);
                return Err(());
            }
        }
        return Ok(());
    }

    match process("stdin", &source, rule) {
        Ok(out) if list => {
            println!("{}", if out == source { "unchanged" } else { "changed" });
            Ok(())
        }
        Ok(out) => {
            print!("{}", out);
            Ok(())
        }
        Err(e) => {
            report(&e, "stdin", &source);
            Err(())
        }
    }
}

fn run_files(files: &[PathBuf], rule: Option<&(String, String)>, list: bool) -> Result<(), ()> {
    for path in files {
        let name = path.display().to_string();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", name, e);
                return Err(());
            }
        };
        let out = match process(&name, &source, rule) {
            Ok(out) => out,
            Err(e) => {
                report(&e, &name, &source);
                return Err(());
            }
        };
        if out == source {
            continue;
        }
        if list {
            println!("{}", name);
            continue;
        }
        if let Err(e) = fs::write(path, &out) {
            eprintln!("Error writing file '{}': {}", name, e);
            return Err(());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_rule() {
        assert_eq!(
            split_rule("index -> strings.Index").unwrap(),
            ("index".to_string(), "strings.Index".to_string())
        );
        assert_eq!(
            split_rule(".Foo.Bar -> .Foo.Baz.Bar").unwrap(),
            (".Foo.Bar".to_string(), ".Foo.Baz.Bar".to_string())
        );
    }

    #[test]
    fn test_split_rule_rejects_malformed() {
        assert!(split_rule("foo").is_err());
        assert!(split_rule(" -> bar").is_err());
        assert!(split_rule("a -> b -> c").is_err());
    }
}
