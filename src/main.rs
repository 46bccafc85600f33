#[macro_use]
extern crate serde_derive;

use std::env;
use std::fmt;
use std::io;
use std::process;

use colored::Colorize;
use docopt::Docopt;

mod align;
mod clustering;
mod cmd;
mod collections;
mod enumerate;
mod hashing;
mod index;
mod ioutil;
mod merge;
mod pairrec;
mod quotehunt;
mod scores;
mod series;
mod tokenizer;
mod util;

static USAGE: &str = "
passim detects, aligns and clusters reused text passages across a corpus
that has already been indexed into n-gram postings.

Usage:
    passim [options] <command> [<args>...]
    passim [options]

Options:
    -h, --help    Display this message
    <command> -h  Display the command help message
    --version     Print version info and exit

Commands:
    pairs     Enumerate candidate document pairs from an index part
    merge     Merge and filter pair records sorted by pair key
    scores    Align merged pairs and emit alignment records
    cluster   Single-link cluster alignment records
    quotes    Hunt a reference text's quotes against the index
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Command {
    Pairs,
    Merge,
    Scores,
    Cluster,
    Quotes,
}

impl Command {
    fn run(&self) -> CliResult<()> {
        let argv: Vec<_> = env::args().collect();
        let argv: Vec<_> = argv.iter().map(|s| &**s).collect();
        let argv = &*argv;

        match self {
            Command::Pairs => cmd::pairs::run(argv),
            Command::Merge => cmd::merge::run(argv),
            Command::Scores => cmd::scores::run(argv),
            Command::Cluster => cmd::cluster::run(argv),
            Command::Quotes => cmd::quotes::run(argv),
        }
    }
}

#[derive(Deserialize)]
struct Args {
    arg_command: Option<Command>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| {
            d.options_first(true)
                .version(Some(util::version()))
                .deserialize()
        })
        .unwrap_or_else(|e| match e {
            docopt::Error::Deserialize(_) => {
                eprintln!(
                    "{}",
                    format!(
                        "Unknown command {}! Run `passim --help` to list available commands.",
                        env::args().nth(1).unwrap_or_else(|| "<missing>".to_string())
                    )
                    .red()
                );
                process::exit(1);
            }
            _ => e.exit(),
        });

    match args.arg_command {
        None => {
            println!("{}", util::colorize_main_help(USAGE));
            process::exit(0);
        }
        Some(cmd) => match cmd.run() {
            Ok(()) => process::exit(0),
            Err(CliError::Flag(err)) => err.exit(),
            Err(CliError::Io(ref err)) if err.kind() == io::ErrorKind::BrokenPipe => {
                process::exit(0);
            }
            Err(CliError::Io(err)) => {
                eprintln!("passim: {}", err);
                process::exit(1);
            }
            Err(CliError::Parse(msg)) => {
                eprintln!("passim: {}", msg);
                process::exit(1);
            }
            Err(CliError::Other(msg)) => {
                eprintln!("passim: {}", msg);
                process::exit(1);
            }
            Err(CliError::Help(usage, exit_code)) => {
                println!("{}", usage);
                process::exit(exit_code);
            }
        },
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    Flag(docopt::Error),
    Io(io::Error),
    /// A malformed line record (pair record, alignment TSV row, …). Distinct
    /// from `Other` so callers can tell a stream-format violation apart from
    /// a plain user-facing message.
    Parse(String),
    Other(String),
    Help(String, i32),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CliError::Flag(ref e) => e.fmt(f),
            CliError::Io(ref e) => e.fmt(f),
            CliError::Parse(ref s) => f.write_str(s),
            CliError::Other(ref s) => f.write_str(s),
            CliError::Help(ref s, _) => f.write_str(s),
        }
    }
}

impl From<docopt::Error> for CliError {
    fn from(err: docopt::Error) -> CliError {
        match err {
            docopt::Error::WithProgramUsage(kind, usage) => {
                let usage = util::colorize_help(&usage);

                match kind.as_ref() {
                    docopt::Error::Help => CliError::Help(usage, 0),
                    _ => CliError::Help(
                        format!(
                            "{}\n\n{} Use the {} flag for more information.",
                            usage,
                            "Invalid command!".red(),
                            "-h,--help".cyan()
                        ),
                        1,
                    ),
                }
            }
            _ => CliError::Flag(err),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> CliError {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> CliError {
        CliError::Parse(err.to_string())
    }
}

impl From<regex::Error> for CliError {
    fn from(err: regex::Error) -> CliError {
        CliError::Other(err.to_string())
    }
}

impl From<pairrec::ParseError> for CliError {
    fn from(err: pairrec::ParseError) -> CliError {
        CliError::Parse(err.to_string())
    }
}

impl From<csv::Error> for CliError {
    fn from(err: csv::Error) -> CliError {
        CliError::Other(err.to_string())
    }
}

impl From<String> for CliError {
    fn from(err: String) -> CliError {
        CliError::Other(err)
    }
}

impl<'a> From<&'a str> for CliError {
    fn from(err: &'a str) -> CliError {
        CliError::Other(err.to_owned())
    }
}
