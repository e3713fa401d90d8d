use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const PROGRAM_LINE: &str = "  reanimator";

#[derive(Debug, Error)]
pub enum MolFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Invalid connectivity: {0}")]
    Molecule(#[from] MoleculeError),
    #[error("Unsupported molfile version (only V2000 is handled)")]
    UnsupportedVersion,
}

fn field(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

/// MDL molfile (V2000 connection table).
pub struct MolFile;

impl MolecularFile for MolFile {
    type Error = MolFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<Molecule, Self::Error> {
        let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
        let line_at = |index: usize| -> Result<&str, MolFileError> {
            lines
                .get(index)
                .map(String::as_str)
                .ok_or_else(|| MolFileError::Parse {
                    line: index + 1,
                    message: "unexpected end of file".to_string(),
                })
        };
        let parse_count = |line: &str, start: usize, line_num: usize| -> Result<usize, MolFileError> {
            let value = field(line, start, start + 3);
            value.parse().map_err(|_| MolFileError::Parse {
                line: line_num,
                message: format!("invalid count '{}'", value),
            })
        };

        let mut molecule = Molecule::new();
        let title = line_at(0)?.trim();
        if !title.is_empty() {
            molecule.name = Some(title.to_string());
        }

        let counts = line_at(3)?;
        if counts.contains("V3000") {
            return Err(MolFileError::UnsupportedVersion);
        }
        let atom_count = parse_count(counts, 0, 4)?;
        let bond_count = parse_count(counts, 3, 4)?;

        for i in 0..atom_count {
            let line_num = 5 + i;
            let line = line_at(4 + i)?;
            let coordinate = |start: usize| -> Result<f64, MolFileError> {
                let value = field(line, start, start + 10);
                value.parse().map_err(|_| MolFileError::Parse {
                    line: line_num,
                    message: format!("invalid coordinate '{}'", value),
                })
            };
            let position = Point3::new(coordinate(0)?, coordinate(10)?, coordinate(20)?);
            let element = field(line, 31, 34);
            if element.is_empty() {
                return Err(MolFileError::Parse {
                    line: line_num,
                    message: "missing element symbol".to_string(),
                });
            }
            let name = format!("{}{}", element, i + 1);
            molecule.add_atom(Atom::new(&name, element, position));
        }

        for i in 0..bond_count {
            let line_num = 5 + atom_count + i;
            let line = line_at(4 + atom_count + i)?;
            let a = parse_count(line, 0, line_num)?;
            let b = parse_count(line, 3, line_num)?;
            let code = parse_count(line, 6, line_num)?;
            let order = u8::try_from(code)
                .ok()
                .and_then(BondOrder::from_mdl_code)
                .ok_or_else(|| MolFileError::Parse {
                    line: line_num,
                    message: format!("unsupported bond type {}", code),
                })?;
            if a == 0 || b == 0 {
                return Err(MolFileError::Parse {
                    line: line_num,
                    message: "atom numbers are 1-based".to_string(),
                });
            }
            molecule.add_bond(a - 1, b - 1, order)?;
        }
        Ok(molecule)
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", molecule.name.as_deref().unwrap_or(""))?;
        writeln!(writer, "{}", PROGRAM_LINE)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
            molecule.len(),
            molecule.bonds().len()
        )?;
        for atom in molecule.atoms() {
            let symbol = if atom.is_placeholder() {
                "*"
            } else {
                atom.element.as_str()
            };
            writeln!(
                writer,
                "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
                atom.position.x, atom.position.y, atom.position.z, symbol
            )?;
        }
        for bond in molecule.bonds() {
            writeln!(
                writer,
                "{:>3}{:>3}{:>3}  0",
                bond.atom1 + 1,
                bond.atom2 + 1,
                bond.order.mdl_code()
            )?;
        }
        writeln!(writer, "M  END")?;
        Ok(())
    }
}
