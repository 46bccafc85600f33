use std::io::BufRead;
use std::path::Path;

use crate::index::FileIndex;
use crate::pairrec::parse_pair_record;
use crate::scores::score_pair;
use crate::util;
use crate::CliResult;

static USAGE: &str = "
Resolves each merged pair's token sequences against the index and runs
anchor-chained and/or full Smith-Waterman-Gotoh alignment, emitting one TSV
record per surviving passage.

Merged pair records are read from stdin.

Usage:
    passim scores [options] <index>
    passim scores --help

scores options:
    -n, --ngram <n>       Anchor n-gram width, or 0 for full-document
                          alignment [default: 5].

Common options:
    -h, --help            Display this message
    -o, --output <file>   Write output to <file> instead of stdout.
";

#[derive(Deserialize)]
struct Args {
    arg_index: String,
    flag_ngram: usize,
    flag_output: Option<String>,
}

pub fn run(argv: &[&str]) -> CliResult<()> {
    let args: Args = util::get_args(USAGE, argv)?;

    let index = FileIndex::open(Path::new(&args.arg_index))?;
    let reader = crate::ioutil::open_input(&None)?;
    let out = crate::ioutil::open_output(&args.flag_output)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(out);

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let record = parse_pair_record(&line)?;
        for score in score_pair(&record, &index, args.flag_ngram) {
            writer.write_record(score.fields())?;
        }
    }

    writer.flush()?;
    Ok(())
}
