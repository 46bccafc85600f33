use std::io::{BufRead, Write};
use std::path::Path;

use tracing::warn;

use crate::index::FileIndex;
use crate::quotehunt::{hunt, QuoteHunterConfig, ReferenceDoc};
use crate::tokenizer::UnicodeTokenizer;
use crate::util;
use crate::CliResult;

static USAGE: &str = "
Hunts quotes of one or more reference documents against the corpus index,
aligning and scoring shared passages (the alternate front end to
pairs/merge/scores, §4.6).

Reference documents are read from stdin as `name\\ttext` TSV rows, one JSON
hit emitted per output line.

Usage:
    passim quotes [options] <index>
    passim quotes --help

quotes options:
    -c, --max-count <n>   Skip n-grams whose posting list exceeds this many
                          documents [default: 1000].
    -g, --max-gap <n>     Split a page's hit chain wherever the gap (in
                          reference positions) exceeds this [default: 200].
    -s, --min-score <f>   Minimum span score to keep [default: 0].
    -p, --pretty           Pretty-print the emitted JSON.
    -w, --words            Include per-word alignment detail (requires OCR
                          bounding-box metadata; omitted when absent).
    -l, --lm <path>        Optional language model path (unused by this
                          implementation; accepted for CLI compatibility).

Common options:
    -h, --help             Display this message
    --output <file>        Write output to <file> instead of stdout.
";

#[derive(Deserialize)]
struct Args {
    arg_index: String,
    flag_max_count: u32,
    flag_max_gap: u32,
    flag_min_score: f64,
    flag_pretty: bool,
    flag_words: bool,
    flag_lm: Option<String>,
    flag_output: Option<String>,
}

#[derive(Serialize)]
struct QuoteHitOutput<'a> {
    page: u32,
    name: &'a str,
    date: &'a Option<String>,
    title: &'a Option<String>,
    language: &'a Option<String>,
    url: &'a Option<String>,
    score: f64,
    matches: u32,
    gaps: u32,
    swscore: f64,
    cites: &'a [String],
    text1: &'a str,
    align1: &'a str,
    align2: &'a str,
}

pub fn run(argv: &[&str]) -> CliResult<()> {
    let args: Args = util::get_args(USAGE, argv)?;

    if args.flag_lm.is_some() {
        warn!("--lm was given but this implementation has no language-model scoring plug-in");
    }
    if args.flag_words {
        warn!("--words requested but no OCR bounding-box metadata is modeled; omitting per-word detail");
    }

    let index = FileIndex::open(Path::new(&args.arg_index))?;
    let reader = crate::ioutil::open_input(&None)?;
    let mut out = crate::ioutil::open_output(&args.flag_output)?;

    let mut refs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let (name, text) = line
            .split_once('\t')
            .ok_or_else(|| crate::CliError::Parse("malformed reference row: expected name\\ttext".to_string()))?;

        refs.push(ReferenceDoc {
            name: name.to_string(),
            text: text.to_string(),
        });
    }

    let config = QuoteHunterConfig {
        max_count: args.flag_max_count,
        max_gap: args.flag_max_gap,
        min_score: args.flag_min_score,
        ..QuoteHunterConfig::default()
    };

    let tokenizer = UnicodeTokenizer;
    let hits = hunt(&refs, &index, &tokenizer, &config);

    for hit in hits {
        let output = QuoteHitOutput {
            page: hit.page,
            name: &hit.page_name,
            date: &hit.date,
            title: &hit.title,
            language: &hit.language,
            url: &hit.url,
            score: hit.score,
            matches: hit.matches,
            gaps: hit.gaps,
            swscore: hit.swscore,
            cites: &hit.cites,
            text1: &hit.text1,
            align1: &hit.align1,
            align2: &hit.align2,
        };

        let rendered = if args.flag_pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };

        writeln!(out, "{rendered}")?;
    }

    Ok(())
}
