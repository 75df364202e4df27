//! The driver side of a self-attach: a short-lived subprocess that connects
//! to the target process's attach endpoint and asks it to load a receiver
//! package. It exists so the attach handshake originates from outside the
//! target, exactly like a hand-run attach would.
//!
//! Exit codes are part of the contract the bootstrap layer relies on:
//! `0` success (or help), `1` attach failure, `2` malformed arguments.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use anyhow::Result;
use anyhow::ensure;
use clap::CommandFactory;
use clap::Parser;
use regex_lite::Regex;

pub const EXIT_OK: i32 = 0;
pub const EXIT_ATTACH_FAILED: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Spellings accepted as a lone help request, beyond what the parser
/// already understands.
pub const HELP_ALIASES: [&str; 10] = [
    "-help", "-h", "-?", "--help", "help", "--h", "--?", "?", "/?", "h",
];

#[derive(Debug, Parser)]
#[command(
    name = "dynattach-driver",
    about = "Attach to a running process and load a receiver package into it"
)]
pub struct DriverCommand {
    /// Process id of the attach target.
    #[arg(value_parser = check_pid_shape)]
    pub pid: String,

    /// Receiver package to load into the target.
    pub package: PathBuf,

    /// Options string handed to the receiver on delivery.
    pub options: Option<String>,
}

/// Entry point for the `dynattach-driver` binary.
pub fn run_main() -> ! {
    run_main_from(std::env::args_os())
}

/// As [`run_main`], with an explicit argument vector. The first element is
/// the program-name slot; this is what the bootstrap dispatch calls after
/// peeling off its own argument.
pub fn run_main_from<I>(args: I) -> !
where
    I: IntoIterator<Item = OsString>,
{
    let args: Vec<OsString> = args.into_iter().collect();
    if is_help_request(&args) {
        let _ = DriverCommand::command().print_help();
        std::process::exit(EXIT_OK);
    }
    let command = match DriverCommand::try_parse_from(&args) {
        Ok(command) => command,
        // Exits 0 for --help/--version output, 2 for usage errors.
        Err(err) => err.exit(),
    };
    match run(&command) {
        Ok(()) => std::process::exit(EXIT_OK),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(EXIT_ATTACH_FAILED);
        }
    }
}

fn run(command: &DriverCommand) -> Result<()> {
    let pid: u32 = command
        .pid
        .parse()
        .with_context(|| format!("pid {} is out of range", command.pid))?;
    let package = &command.package;
    let metadata = fs::metadata(package)
        .with_context(|| format!("cannot read package {}", package.display()))?;
    ensure!(
        metadata.is_file(),
        "package {} is not a regular file",
        package.display()
    );
    println!("Attaching to process {pid}...");
    dynattach_attach::load_package(pid, package, command.options.as_deref())
        .with_context(|| format!("attach to process {pid} failed"))?;
    println!("Attached successfully!");
    Ok(())
}

/// A single argument that is any of the historical help spellings.
fn is_help_request(args: &[OsString]) -> bool {
    if args.len() != 2 {
        return false;
    }
    args[1]
        .to_str()
        .is_some_and(|arg| HELP_ALIASES.contains(&arg))
}

/// Shape check only; numeric range is enforced later so an absurdly large
/// pid reads as an attach failure, not a usage error.
fn check_pid_shape(value: &str) -> Result<String, String> {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    let shape = SHAPE.get_or_init(|| Regex::new(r"^\d{1,10}$").unwrap());
    if shape.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(format!("`{value}` is not a process id"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pid_shape_accepts_plain_digit_runs() {
        for value in ["0", "1", "4294967295", "9999999999"] {
            assert!(check_pid_shape(value).is_ok(), "{value}");
        }
    }

    #[test]
    fn pid_shape_rejects_everything_else() {
        for value in ["", "abc", "-1", "1.5", "12345678901", " 42"] {
            assert!(check_pid_shape(value).is_err(), "{value}");
        }
    }

    #[test]
    fn every_help_alias_is_recognized() {
        for alias in HELP_ALIASES {
            let args = vec![OsString::from("dynattach-driver"), OsString::from(alias)];
            assert!(is_help_request(&args), "{alias}");
        }
    }

    #[test]
    fn ordinary_arguments_are_not_help_requests() {
        let args = vec![OsString::from("dynattach-driver"), OsString::from("1234")];
        assert!(!is_help_request(&args));
        let two = vec![
            OsString::from("dynattach-driver"),
            OsString::from("-h"),
            OsString::from("1234"),
        ];
        assert!(!is_help_request(&two));
    }

    #[test]
    fn arguments_parse_in_positional_order() {
        let command = DriverCommand::try_parse_from([
            "dynattach-driver",
            "1234",
            "/tmp/receiver.pkg",
            "verbose",
        ])
        .unwrap();
        assert_eq!(command.pid, "1234");
        assert_eq!(command.package, PathBuf::from("/tmp/receiver.pkg"));
        assert_eq!(command.options.as_deref(), Some("verbose"));
    }
}
