use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use storage::DynamicIndex;

use crate::{term_map::TermMap, Result};

/// Lines of a text file, read lazily.
pub fn read_lines(path: impl AsRef<Path>) -> io::Result<impl Iterator<Item = io::Result<String>>> {
    Ok(BufReader::new(File::open(path)?).lines())
}

/// Tokenizes every line of a corpus, blank lines included (as empty
/// sequences) so that line numbers are preserved.
pub fn read_corpus(path: impl AsRef<Path>, terms: &mut TermMap) -> Result<Vec<Vec<u32>>> {
    let mut lines = Vec::new();
    for line in read_lines(path)? {
        lines.push(terms.tokenize_line(&line?));
    }
    Ok(lines)
}

/// One whitespace-tokenized phrase per line; blank lines are skipped.
pub fn read_phrase_list(path: impl AsRef<Path>, terms: &mut TermMap) -> Result<Vec<Vec<u32>>> {
    let mut phrases = Vec::new();
    for line in read_lines(path)? {
        let phrase = terms.tokenize_line(&line?);
        if !phrase.is_empty() {
            phrases.push(phrase);
        }
    }
    Ok(phrases)
}

/// Writes the phrases of `table` in id order, in the format
/// [`read_phrase_list`] reads back with the same ids.
pub fn write_phrase_list(mut out: impl Write, table: &DynamicIndex, terms: &TermMap) -> io::Result<()> {
    for (_, phrase) in table.iter() {
        writeln!(out, "{}", terms.render(phrase))?;
    }
    out.flush()
}
