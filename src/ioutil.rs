use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use flate2::read::MultiGzDecoder;

/// Opens `path` for line-oriented reading. `None` or `"-"` means stdin.
/// Transparent gzip decompression is applied when the path ends in `.gz`,
/// mirroring the teacher crate's `config.rs` handling of compressed inputs.
pub fn open_input(path: &Option<String>) -> io::Result<Box<dyn BufRead>> {
    match path {
        None => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(p) if p == "-" => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(p) => {
            let file = File::open(p)?;

            if p.ends_with(".gz") {
                Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
            } else {
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Opens `path` for line-oriented writing. `None` or `"-"` means stdout.
pub fn open_output(path: &Option<String>) -> io::Result<Box<dyn Write>> {
    match path {
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
        Some(p) if p == "-" => Ok(Box::new(BufWriter::new(io::stdout()))),
        Some(p) => Ok(Box::new(BufWriter::new(File::create(p)?))),
    }
}

/// Reads the lines of `path` eagerly into a `Vec<String>`, skipping blank lines.
/// Used for small auxiliary inputs (stopword lists, series-map TSVs).
pub fn read_lines(path: &str) -> io::Result<Vec<String>> {
    let reader = open_input(&Some(path.to_string()))?;

    reader
        .lines()
        .filter_map(|line| match line {
            Ok(l) if l.is_empty() => None,
            other => Some(other),
        })
        .collect()
}
