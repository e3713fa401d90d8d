use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::{Atom, ResidueInfo};
use crate::core::models::locator::ResidueLocator;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use crate::core::utils::identifiers::{UNSPECIFIED_LIGAND_CODE, pad_atom_name};
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: &'static str, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Atom,
    Hetatm,
}

impl RecordKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Atom => "ATOM",
            Self::Hetatm => "HETATM",
        }
    }
}

/// Serials wrap at the five-column field width, in atom and `CONECT` records alike.
fn written_serial(serial: usize) -> usize {
    serial % 100_000
}

/// One `ATOM`/`HETATM` record.
#[derive(Debug, Clone, PartialEq)]
pub struct PdbAtomRecord {
    pub kind: RecordKind,
    pub serial: usize,
    pub name: String,
    pub alt_loc: char,
    pub residue_name: String,
    pub chain_id: char,
    pub residue_number: isize,
    pub insertion_code: char,
    pub position: Point3<f64>,
    pub occupancy: f64,
    pub temp_factor: f64,
    pub element: String,
}

impl PdbAtomRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{:<6}{:>5} {:<4}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
            self.kind.tag(),
            written_serial(self.serial),
            pad_atom_name(&self.name),
            self.alt_loc,
            self.residue_name,
            self.chain_id,
            self.residue_number,
            self.insertion_code,
            self.position.x,
            self.position.y,
            self.position.z,
            self.occupancy,
            self.temp_factor,
            self.element,
        )
    }

    pub fn is_at(&self, locator: &ResidueLocator) -> bool {
        self.residue_number == locator.number
            && locator.chain.is_none_or(|chain| chain == self.chain_id)
    }
}

fn column(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn column_char(line: &str, index: usize) -> char {
    line.get(index..index + 1)
        .and_then(|s| s.chars().next())
        .unwrap_or(' ')
}

fn infer_element(atom_name: &str) -> String {
    atom_name
        .trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic() || *c == '*')
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

fn parse_record(line: &str, line_num: usize, kind: RecordKind) -> Result<PdbAtomRecord, PdbError> {
    let parse_error = |kind: PdbParseErrorKind| PdbError::Parse {
        line: line_num,
        kind,
    };
    let float = |start: usize, end: usize, columns: &'static str| -> Result<f64, PdbError> {
        let value = column(line, start, end);
        value.parse().map_err(|_| {
            parse_error(PdbParseErrorKind::InvalidFloat {
                columns,
                value: value.to_string(),
            })
        })
    };
    let optional_float = |start: usize, end: usize, default: f64| -> f64 {
        column(line, start, end).parse().unwrap_or(default)
    };

    let name = column(line, 12, 16);
    if name.is_empty() {
        return Err(parse_error(PdbParseErrorKind::MissingRequiredField {
            columns: "13-16",
        }));
    }
    let serial_str = column(line, 6, 11);
    let serial = serial_str.parse().map_err(|_| {
        parse_error(PdbParseErrorKind::InvalidInt {
            columns: "7-11",
            value: serial_str.to_string(),
        })
    })?;
    let res_seq_str = column(line, 22, 26);
    let residue_number = res_seq_str.parse().map_err(|_| {
        parse_error(PdbParseErrorKind::InvalidInt {
            columns: "23-26",
            value: res_seq_str.to_string(),
        })
    })?;
    let position = Point3::new(
        float(30, 38, "31-38")?,
        float(38, 46, "39-46")?,
        float(46, 54, "47-54")?,
    );
    let element = match column(line, 76, 78) {
        "" => infer_element(name),
        symbol => symbol.to_string(),
    };

    Ok(PdbAtomRecord {
        kind,
        serial,
        name: name.to_string(),
        alt_loc: column_char(line, 16),
        residue_name: column(line, 17, 20).to_string(),
        chain_id: column_char(line, 21),
        residue_number,
        insertion_code: column_char(line, 26),
        position,
        occupancy: optional_float(54, 60, 1.0),
        temp_factor: optional_float(60, 66, 0.0),
        element,
    })
}

/// An ordered set of atom records plus the bonds declared between them.
///
/// Bonds are kept as pairs of record indices so that filtering and renumbering
/// never leave a bond pointing at a removed atom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbStructure {
    pub records: Vec<PdbAtomRecord>,
    bonds: Vec<(usize, usize)>,
}

impl PdbStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(block: &str) -> Result<Self, PdbError> {
        let mut structure = Self::new();
        let mut serial_to_index: HashMap<usize, usize> = HashMap::new();
        let mut raw_conects: Vec<(usize, usize, usize)> = Vec::new();

        for (line_num, line) in block.lines().enumerate() {
            let line_num = line_num + 1;
            let kind = match column(line, 0, 6) {
                "ATOM" => RecordKind::Atom,
                "HETATM" => RecordKind::Hetatm,
                "CONECT" => {
                    let mut serials = line
                        .get(6..)
                        .unwrap_or("")
                        .split_whitespace()
                        .filter_map(|s| s.parse::<usize>().ok());
                    if let Some(origin) = serials.next() {
                        for partner in serials {
                            raw_conects.push((line_num, origin, partner));
                        }
                    }
                    continue;
                }
                "END" | "ENDMDL" => break,
                _ => continue,
            };
            let record = parse_record(line, line_num, kind)?;
            serial_to_index.insert(record.serial, structure.records.len());
            structure.records.push(record);
        }

        for (line_num, a, b) in raw_conects {
            let (Some(&ia), Some(&ib)) = (serial_to_index.get(&a), serial_to_index.get(&b)) else {
                return Err(PdbError::Inconsistency(format!(
                    "CONECT on line {} references unknown serial {} or {}",
                    line_num, a, b
                )));
            };
            structure.add_bond(ia, ib);
        }
        Ok(structure)
    }

    /// Builds `HETATM` records for a molecule, using `fallback` for atoms without residue data.
    pub fn from_molecule(molecule: &Molecule, fallback: &ResidueInfo) -> Self {
        let mut structure = Self::new();
        for (i, atom) in molecule.atoms().iter().enumerate() {
            let residue = atom.residue.as_ref().unwrap_or(fallback);
            structure.records.push(PdbAtomRecord {
                kind: RecordKind::Hetatm,
                serial: i + 1,
                name: atom.name.clone(),
                alt_loc: ' ',
                residue_name: residue.name.clone(),
                chain_id: residue.chain_id,
                residue_number: residue.number,
                insertion_code: ' ',
                position: atom.position,
                occupancy: 1.0,
                temp_factor: 0.0,
                element: atom.element.clone(),
            });
        }
        for bond in molecule.bonds() {
            structure.add_bond(bond.atom1, bond.atom2);
        }
        structure
    }

    pub fn to_molecule(&self) -> Molecule {
        let mut molecule = Molecule::new();
        for record in &self.records {
            molecule.add_atom(
                Atom::new(&record.name, &record.element, record.position).with_residue(
                    ResidueInfo::new(
                        &record.residue_name,
                        record.residue_number,
                        record.chain_id,
                    ),
                ),
            );
        }
        for &(a, b) in &self.bonds {
            // Indices come from this structure, so they are always in range.
            let _ = molecule.add_bond(a, b, BondOrder::Single);
        }
        molecule
    }

    pub fn bonds(&self) -> &[(usize, usize)] {
        &self.bonds
    }

    fn add_bond(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let key = (a.min(b), a.max(b));
        if !self.bonds.contains(&key) {
            self.bonds.push(key);
        }
    }

    /// Appends every record and bond of `other` after the records of `self`.
    pub fn extend(&mut self, other: PdbStructure) {
        let offset = self.records.len();
        self.records.extend(other.records);
        for (a, b) in other.bonds {
            self.bonds.push((a + offset, b + offset));
        }
    }

    /// Keeps only the records for which `keep` returns `true`, dropping bonds to removed records.
    pub fn retain(&mut self, mut keep: impl FnMut(&PdbAtomRecord) -> bool) {
        let mut remap = vec![None; self.records.len()];
        let mut kept = Vec::with_capacity(self.records.len());
        for (i, record) in self.records.drain(..).enumerate() {
            if keep(&record) {
                remap[i] = Some(kept.len());
                kept.push(record);
            }
        }
        self.records = kept;
        self.bonds = self
            .bonds
            .iter()
            .filter_map(|&(a, b)| Some((remap[a]?, remap[b]?)))
            .collect();
    }

    /// Assigns serial numbers 1..=n in record order.
    pub fn renumber(&mut self) {
        for (i, record) in self.records.iter_mut().enumerate() {
            record.serial = i + 1;
        }
    }

    pub fn find_atom(&self, locator: &ResidueLocator, atom_name: &str) -> Option<&PdbAtomRecord> {
        let atom_name = atom_name.trim();
        self.records
            .iter()
            .find(|r| r.is_at(locator) && r.name == atom_name)
    }

    /// The locator of the first residue in record order.
    pub fn first_residue(&self) -> Option<ResidueLocator> {
        self.records
            .first()
            .map(|r| ResidueLocator::new(r.residue_number, Some(r.chain_id)))
    }

    pub fn contains_residue_name(&self, residue_name: &str) -> bool {
        self.records.iter().any(|r| r.residue_name == residue_name)
    }

    /// Serializes the structure: records, a `TER` after each chain, `CONECT`s, then `END`.
    pub fn to_pdb_string(&self) -> String {
        let mut out = String::new();
        for (i, record) in self.records.iter().enumerate() {
            let _ = writeln!(out, "{}", record.to_line());
            let chain_ends = self
                .records
                .get(i + 1)
                .is_none_or(|next| next.chain_id != record.chain_id || next.kind != record.kind);
            if chain_ends && record.kind == RecordKind::Atom {
                let _ = writeln!(out, "TER");
            }
        }

        let mut conects: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &(a, b) in &self.bonds {
            let (sa, sb) = (
                written_serial(self.records[a].serial),
                written_serial(self.records[b].serial),
            );
            conects.entry(sa).or_default().push(sb);
            conects.entry(sb).or_default().push(sa);
        }
        for (serial, mut partners) in conects {
            partners.sort_unstable();
            let _ = write!(out, "CONECT{:>5}", serial);
            for partner in partners {
                let _ = write!(out, "{:>5}", partner);
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "END");
        out
    }
}

pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<Molecule, Self::Error> {
        let mut block = String::new();
        reader.read_to_string(&mut block)?;
        let structure = PdbStructure::parse(&block)?;
        if structure.records.is_empty() {
            return Err(PdbError::Inconsistency(
                "no ATOM/HETATM records found".to_string(),
            ));
        }
        Ok(structure.to_molecule())
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        let fallback = ResidueInfo::new(UNSPECIFIED_LIGAND_CODE, 1, ' ');
        let structure = PdbStructure::from_molecule(molecule, &fallback);
        writer.write_all(structure.to_pdb_string().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECEPTOR: &str = "\
ATOM      1  N   CYS A 145      10.000  11.000  12.000  1.00  0.00           N
ATOM      2  CA  CYS A 145      11.000  11.500  12.500  1.00  0.00           C
ATOM      3  CB  CYS A 145      12.000  12.000  13.000  1.00  0.00           C
ATOM      4  SG  CYS A 145      13.000  12.500  13.500  1.00  0.00           S
ATOM      5  SG  CYS B 145      23.000  22.500  23.500  1.00  0.00           S
END
";

    #[test]
    fn parse_reads_fixed_columns() {
        let structure = PdbStructure::parse(RECEPTOR).unwrap();
        assert_eq!(structure.records.len(), 5);
        let sg = &structure.records[3];
        assert_eq!(sg.name, "SG");
        assert_eq!(sg.residue_name, "CYS");
        assert_eq!(sg.chain_id, 'A');
        assert_eq!(sg.residue_number, 145);
        assert_eq!(sg.position, Point3::new(13.0, 12.5, 13.5));
        assert_eq!(sg.element, "S");
    }

    #[test]
    fn record_line_round_trips_through_the_parser() {
        let structure = PdbStructure::parse(RECEPTOR).unwrap();
        let line = structure.records[1].to_line();
        assert_eq!(&line[..6], "ATOM  ");
        assert_eq!(&line[12..16], " CA ");
        let reparsed = PdbStructure::parse(&line).unwrap();
        assert_eq!(reparsed.records[0], structure.records[1]);
    }

    #[test]
    fn find_atom_honours_optional_chain() {
        let structure = PdbStructure::parse(RECEPTOR).unwrap();
        let with_chain = ResidueLocator::new(145, Some('B'));
        assert_eq!(structure.find_atom(&with_chain, "SG").unwrap().serial, 5);
        let any_chain = ResidueLocator::new(145, None);
        assert_eq!(structure.find_atom(&any_chain, "SG").unwrap().serial, 4);
        assert!(structure.find_atom(&any_chain, "OG").is_none());
    }

    #[test]
    fn parse_reports_bad_coordinates_with_line_number() {
        let bad = "ATOM      1  N   CYS A 145      xx.000  11.000  12.000  1.00  0.00           N\n";
        let err = PdbStructure::parse(bad).unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::InvalidFloat { .. }
            }
        ));
    }

    #[test]
    fn conect_to_unknown_serial_is_inconsistent() {
        let block = format!("{}CONECT    1   99\n", RECEPTOR.replace("END\n", ""));
        assert!(matches!(
            PdbStructure::parse(&block),
            Err(PdbError::Inconsistency(_))
        ));
    }

    #[test]
    fn retain_drops_bonds_to_removed_records() {
        let mut structure = PdbStructure::parse(RECEPTOR).unwrap();
        structure.add_bond(0, 1);
        structure.add_bond(2, 3);
        structure.retain(|r| r.name != "CB");
        assert_eq!(structure.records.len(), 4);
        assert_eq!(structure.bonds(), &[(0, 1)]);
        structure.renumber();
        let serials: Vec<_> = structure.records.iter().map(|r| r.serial).collect();
        assert_eq!(serials, vec![1, 2, 3, 4]);
    }

    #[test]
    fn molecule_round_trip_keeps_names_and_connectivity() {
        let mut mol = Molecule::new();
        let a = mol.add_atom(Atom::new("C1", "C", Point3::new(0.0, 0.0, 0.0)));
        let b = mol.add_atom(Atom::new("O1", "O", Point3::new(1.2, 0.0, 0.0)));
        mol.add_bond(a, b, BondOrder::Double).unwrap();

        let text = PdbFile::write_to_string(&mol).unwrap();
        assert!(text.contains("UNL"));
        assert!(text.contains("CONECT    1    2"));
        let back = PdbFile::read_from_str(&text).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.atoms()[1].name, "O1");
        assert_eq!(back.atoms()[1].element, "O");
        assert_eq!(back.bonds().len(), 1);
    }

    #[test]
    fn conect_serials_wrap_like_atom_serials() {
        let mut structure = PdbStructure::parse(RECEPTOR).unwrap();
        structure.records[0].serial = 100_001;
        structure.records[1].serial = 100_002;
        structure.add_bond(0, 1);
        let text = structure.to_pdb_string();
        assert_eq!(&text[6..11], "    1");
        assert!(text.contains("CONECT    1    2\n"));
        assert!(!text.contains("100001"));
    }

    #[test]
    fn reading_an_empty_block_fails() {
        assert!(PdbFile::read_from_str("REMARK nothing here\nEND\n").is_err());
    }

    #[test]
    fn ter_is_written_after_each_protein_chain() {
        let structure = PdbStructure::parse(RECEPTOR).unwrap();
        let text = structure.to_pdb_string();
        assert_eq!(text.matches("TER").count(), 2);
        assert!(text.ends_with("END\n"));
    }
}
