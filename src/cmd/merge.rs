use std::io::{BufRead, Write};

use crate::merge::merge_pairs;
use crate::pairrec::parse_pair_record;
use crate::util;
use crate::CliResult;

static USAGE: &str = "
Merges pair-key-contiguous candidate pair records (as produced by `pairs`,
sorted externally by pair key), concatenating feature lists for the same
pair and dropping pairs below a minimum feature count.

Usage:
    passim merge [options] [<input>]
    passim merge --help

merge options:
    -m, --min-matches <n>  Minimum concatenated feature count to keep a pair
                           [default: 1].

Common options:
    -h, --help             Display this message
    -o, --output <file>    Write output to <file> instead of stdout.
";

#[derive(Deserialize)]
struct Args {
    arg_input: Option<String>,
    flag_min_matches: usize,
    flag_output: Option<String>,
}

pub fn run(argv: &[&str]) -> CliResult<()> {
    let args: Args = util::get_args(USAGE, argv)?;

    let reader = crate::ioutil::open_input(&args.arg_input)?;
    let mut out = crate::ioutil::open_output(&args.flag_output)?;

    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        records.push(parse_pair_record(&line)?);
    }

    merge_pairs(records, args.flag_min_matches, |record| {
        let _ = writeln!(out, "{record}");
    });

    Ok(())
}
