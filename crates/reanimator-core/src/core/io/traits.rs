use crate::core::models::molecule::Molecule;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing single-molecule file formats.
///
/// Implementors handle format-specific parsing and serialization; the provided
/// methods add path and in-memory string conveniences on top.
pub trait MolecularFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a molecule from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<Molecule, Self::Error>;

    /// Writes a molecule to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a molecule from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Molecule, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a molecule to a file path, creating or truncating the file.
    fn write_to_path<P: AsRef<Path>>(molecule: &Molecule, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(molecule, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Parses a molecule from an in-memory block of text.
    fn read_from_str(block: &str) -> Result<Molecule, Self::Error> {
        let mut reader = block.as_bytes();
        Self::read_from(&mut reader)
    }

    /// Serializes a molecule into a block of text.
    fn write_to_string(molecule: &Molecule) -> Result<String, Self::Error> {
        let mut buffer = Vec::new();
        Self::write_to(molecule, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
