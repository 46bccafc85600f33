use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::clustering::{Clusterer, LinkageCriterion, MemberRecord};
use crate::series::series_prefix;
use crate::util;
use crate::CliResult;

static USAGE: &str = "
Greedily single-link clusters alignment records (as produced by `scores`)
by span overlap, with quota pruning for runaway self-reprint chains.

Alignment records are read from stdin, one JSON cluster per output line.

Usage:
    passim cluster [options]
    passim cluster --help

cluster options:
    -m, --min-overlap <n>       Absolute token overlap required to link two
                                spans; 0 disables it in favor of
                                --relative-overlap [default: 0].
    -o, --relative-overlap <f>  Overlap as a fraction of the longer span,
                                used when --min-overlap is 0 [default: 0.5].
    -p, --max-proportion <f>    Drop clusters where one series exceeds this
                                share of members; 1.0 disables the check
                                [default: 1.0].
    -r, --max-repeats <n>       Drop clusters where one series contributes
                                more than this many members [default: 4].

Common options:
    -h, --help                  Display this message
    --output <file>             Write output to <file> instead of stdout.
";

#[derive(Deserialize)]
struct Args {
    flag_min_overlap: u32,
    flag_relative_overlap: f64,
    flag_max_proportion: f64,
    flag_max_repeats: u32,
    flag_output: Option<String>,
}

pub fn run(argv: &[&str]) -> CliResult<()> {
    let args: Args = util::get_args(USAGE, argv)?;

    let criterion = if args.flag_min_overlap > 0 {
        LinkageCriterion::Absolute(args.flag_min_overlap)
    } else {
        LinkageCriterion::Relative(args.flag_relative_overlap)
    };

    let reader = crate::ioutil::open_input(&None)?;
    let mut out = crate::ioutil::open_output(&args.flag_output)?;

    let mut clusterer = Clusterer::new();
    let mut series_interner: HashMap<String, u32> = HashMap::new();
    let mut next_series_id = 0u32;

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let (r1, r2) = parse_alignment_record(&line, &mut series_interner, &mut next_series_id)?;
        clusterer.process(r1, r2, criterion);
    }

    let clusters = clusterer.into_clusters(args.flag_max_proportion, args.flag_max_repeats);

    for cluster in clusters {
        writeln!(out, "{}", serde_json::to_string(&cluster)?)?;
    }

    Ok(())
}

/// Parses one `scores`-format TSV line into the two `MemberRecord`s the
/// clusterer links against (§4.5 step 1). Series ids are interned locally
/// from each document's name prefix, since the clustering stream carries
/// names rather than a shared `docId -> series` table.
fn parse_alignment_record(
    line: &str,
    series_interner: &mut HashMap<String, u32>,
    next_series_id: &mut u32,
) -> CliResult<(MemberRecord, MemberRecord)> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 16 {
        return Err(crate::CliError::Parse(format!(
            "malformed alignment record: expected 16 fields, got {}",
            fields.len()
        )));
    }

    let parse_u32 = |s: &str| -> CliResult<u32> {
        s.parse()
            .map_err(|_| crate::CliError::Parse(format!("bad integer field: {s}")))
    };
    let parse_f64 = |s: &str| -> CliResult<f64> {
        s.parse()
            .map_err(|_| crate::CliError::Parse(format!("bad float field: {s}")))
    };

    let swscore = parse_f64(fields[5])?;
    let id1 = parse_u32(fields[6])?;
    let id2 = parse_u32(fields[7])?;
    let name1 = fields[8].to_string();
    let name2 = fields[9].to_string();
    let s1 = parse_u32(fields[10])?;
    let e1 = parse_u32(fields[11])?;
    let s2 = parse_u32(fields[12])?;
    let e2 = parse_u32(fields[13])?;

    let mut series_of = |name: &str| -> u32 {
        let prefix = series_prefix(name).to_string();
        *series_interner.entry(prefix).or_insert_with(|| {
            let id = *next_series_id;
            *next_series_id += 1;
            id
        })
    };

    let series1 = series_of(&name1);
    let series2 = series_of(&name2);

    Ok((
        MemberRecord {
            doc_id: id1,
            name: name1,
            series: series1,
            start: s1,
            end: e1,
            score: swscore,
        },
        MemberRecord {
            doc_id: id2,
            name: name2,
            series: series2,
            start: s2,
            end: e2,
            score: swscore,
        },
    ))
}
