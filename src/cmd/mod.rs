pub mod report;
pub mod schema;
pub mod validate;

use crate::core::{input, Movement};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read movements from a CSV or JSON file (or stdin with "-").
/// Files ending in `.json` are JSON, everything else is CSV.
pub fn read_movements(path: &Path) -> anyhow::Result<Vec<Movement>> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        read_from_file(path)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read_from_file(path: &Path) -> anyhow::Result<Vec<Movement>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let movements = if is_json(path) {
        input::read_json(reader)?
    } else {
        input::read_csv(reader)?
    };
    log::info!("Read {} movements from {}", movements.len(), path.display());
    Ok(movements)
}

fn read_from_stdin() -> anyhow::Result<Vec<Movement>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    let movements = input::read_csv(io::Cursor::new(buffer))?;
    log::info!("Read {} movements from stdin", movements.len());
    Ok(movements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_detected_by_extension() {
        assert!(is_json(Path::new("trades.json")));
        assert!(is_json(Path::new("dir/TRADES.JSON")));
        assert!(!is_json(Path::new("trades.csv")));
        assert!(!is_json(Path::new("trades")));
    }
}
