pub mod convert;
pub mod parse;
pub mod run;

use crate::error::Result;
use std::path::Path;
use tracing::info;

/// Writes `content` to `path`, or to standard output when no path is given.
fn emit(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)?;
            info!(path = %path.display(), "Wrote output file.");
        }
        None => print!("{}", content),
    }
    Ok(())
}
