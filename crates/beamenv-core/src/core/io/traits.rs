use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for translating foreign lattice formats into GLPS text.
///
/// Implementors hold whatever per-run state the translation needs, so a
/// translator is used through `&mut self`.
pub trait LatticeTranslator {
    /// The error type for translation failures.
    type Error: Error + From<io::Error>;

    /// Reads the foreign format from `reader` and writes GLPS text to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed or an I/O operation fails.
    fn translate(
        &mut self,
        reader: &mut impl BufRead,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Translates into an in-memory string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed or cannot be read.
    fn translate_to_string(&mut self, reader: &mut impl BufRead) -> Result<String, Self::Error> {
        let mut buffer = Vec::new();
        self.translate(reader, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Translates the file at `input` into a new file at `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be opened or translation fails.
    fn translate_path<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input: P,
        output: Q,
    ) -> Result<(), Self::Error> {
        let mut reader = BufReader::new(File::open(input)?);
        let mut writer = BufWriter::new(File::create(output)?);
        self.translate(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
