use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use crate::enumerate::{enumerate_counts, enumerate_pairs, EnumerateConfig};
use crate::index::{FileIndex, IndexStore};
use crate::series::SeriesMap;
use crate::util;
use crate::CliResult;

static USAGE: &str = "
Enumerates candidate cross-series document pairs from an index part by
walking its n-gram posting lists.

Usage:
    passim pairs [options] <index>
    passim pairs --help

pairs options:
    -c, --counts               Emit a seriesA/seriesB/count histogram instead
                                of individual pair records.
    -u, --max-series <n>       Cap on effective series-size cross-count per
                                feature [default: 100].
    -d, --max-df <n>           Drop any per-document term frequency exceeding
                                this [default: 100].
    -m, --series-map <path>    Precomputed docId\\tseriesId TSV; if absent,
                                the series map is derived from document names.
    -p, --modp <n>             Shard keys by hash(key) mod modp [default: 1].
    -r, --modrec <n>           Shard pairs by hash(pair) mod modrec [default: 1].
    -s, --step <n>             Shard index: skip step*stride keys [default: 0].
    -t, --stride <n>           Number of keys to process per shard [default: 1000].
    -w, --word-length <f>      Drop features whose mean token length is below
                                this [default: 1.5].
    -S, --stop <path>          Stopword list, one token per line.

Common options:
    -h, --help                 Display this message
    -o, --output <file>        Write output to <file> instead of stdout.
";

#[derive(Deserialize)]
struct Args {
    arg_index: String,
    flag_counts: bool,
    flag_max_series: u32,
    flag_max_df: u32,
    flag_series_map: Option<String>,
    flag_modp: u64,
    flag_modrec: u64,
    flag_step: usize,
    flag_stride: usize,
    flag_word_length: f64,
    flag_stop: Option<String>,
    flag_output: Option<String>,
}

pub fn run(argv: &[&str]) -> CliResult<()> {
    let args: Args = util::get_args(USAGE, argv)?;

    let index = FileIndex::open(Path::new(&args.arg_index))?;

    let series_map = match &args.flag_series_map {
        Some(path) => SeriesMap::load_tsv(path)?,
        None => {
            let names: Vec<&str> = index.names().map(|(_, n)| n).collect();
            SeriesMap::from_names(names)
        }
    };

    let stopwords: HashSet<String> = match &args.flag_stop {
        Some(path) => crate::ioutil::read_lines(path)?.into_iter().collect(),
        None => HashSet::new(),
    };

    let config = EnumerateConfig {
        max_series: args.flag_max_series,
        max_df: args.flag_max_df,
        modp: args.flag_modp,
        modrec: args.flag_modrec,
        step: args.flag_step,
        stride: args.flag_stride,
        word_length: args.flag_word_length,
        stopwords,
    };

    let out = crate::ioutil::open_output(&args.flag_output)?;

    if args.flag_counts {
        let histogram = enumerate_counts(&index, &series_map, &config)?;
        let mut rows: Vec<_> = histogram.into_iter().collect();
        rows.sort();

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(out);
        for ((a, b), count) in rows {
            writer.write_record([a.to_string(), b.to_string(), count.to_string()])?;
        }
        writer.flush()?;
    } else {
        let mut out = out;
        enumerate_pairs(&index, &series_map, &config, |record| {
            let _ = writeln!(out, "{record}");
        })?;
    }

    Ok(())
}
