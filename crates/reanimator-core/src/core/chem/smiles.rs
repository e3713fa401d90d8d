use crate::core::models::atom::Atom;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;

/// Marker for an attachment point in a connectivity string.
pub const ATTACHMENT_MARKER: char = '*';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Connectivity string is empty")]
    Empty,
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { position: usize, character: char },
    #[error("Bracket atom opened at position {0} is never closed")]
    UnclosedBracket(usize),
    #[error("Unbalanced branch at position {0}")]
    UnbalancedBranch(usize),
    #[error("Ring closure {0} is never closed")]
    UnclosedRing(u32),
    #[error("Bond symbol at position {0} is not followed by an atom")]
    DanglingBond(usize),
    #[error(transparent)]
    Molecule(#[from] MoleculeError),
}

/// Where a placeholder sits in a parsed fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentSite {
    /// Index of the placeholder atom.
    pub placeholder: usize,
    /// The real atom bonded to the placeholder.
    pub attached: usize,
    /// A further neighbour of `attached`, used to define the bond angle.
    pub neighbour: Option<usize>,
}

/// Whether the string carries an attachment marker at all.
pub fn has_attachment_marker(smiles: &str) -> bool {
    smiles.contains(ATTACHMENT_MARKER)
}

/// Parses the atom/bond graph of a connectivity string.
///
/// Atoms are returned in the order they are written. Coordinates are left at
/// the origin and atoms are named `<element><ordinal>`.
pub fn parse(smiles: &str) -> Result<Molecule, SmilesError> {
    let smiles = smiles.trim();
    if smiles.is_empty() {
        return Err(SmilesError::Empty);
    }
    let chars: Vec<char> = smiles.chars().collect();
    let mut parser = Parser::default();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '(' => {
                let current = parser.previous.ok_or(SmilesError::UnbalancedBranch(pos))?;
                parser.branches.push(current);
                pos += 1;
            }
            ')' => {
                if parser.pending_bond.is_some() {
                    return Err(SmilesError::DanglingBond(pos));
                }
                parser.previous = Some(parser.branches.pop().ok_or(SmilesError::UnbalancedBranch(pos))?);
                pos += 1;
            }
            '-' | '/' | '\\' | '=' | '#' | ':' => {
                if parser.previous.is_none() {
                    return Err(SmilesError::UnexpectedCharacter { position: pos, character: c });
                }
                parser.pending_bond = Some((bond_symbol(c), pos));
                pos += 1;
            }
            '.' => {
                if parser.pending_bond.is_some() {
                    return Err(SmilesError::DanglingBond(pos));
                }
                parser.previous = None;
                pos += 1;
            }
            '0'..='9' => {
                let label = c.to_digit(10).unwrap_or_default();
                parser.ring_closure(label, pos)?;
                pos += 1;
            }
            '%' => {
                let digits: String = chars.iter().skip(pos + 1).take(2).collect();
                let label = digits
                    .parse::<u32>()
                    .ok()
                    .filter(|_| digits.len() == 2)
                    .ok_or(SmilesError::UnexpectedCharacter { position: pos, character: c })?;
                parser.ring_closure(label, pos)?;
                pos += 3;
            }
            '[' => {
                let close = chars[pos..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|offset| pos + offset)
                    .ok_or(SmilesError::UnclosedBracket(pos))?;
                let (element, aromatic) = bracket_element(&chars[pos + 1..close])
                    .ok_or(SmilesError::UnexpectedCharacter { position: pos + 1, character: c })?;
                parser.add_atom(&element, aromatic)?;
                pos = close + 1;
            }
            _ => {
                let (element, aromatic, width) = organic_element(&chars[pos..])
                    .ok_or(SmilesError::UnexpectedCharacter { position: pos, character: c })?;
                parser.add_atom(element, aromatic)?;
                pos += width;
            }
        }
    }

    if let Some((_, position)) = parser.pending_bond {
        return Err(SmilesError::DanglingBond(position));
    }
    if !parser.branches.is_empty() {
        return Err(SmilesError::UnbalancedBranch(chars.len()));
    }
    if let Some(label) = parser.rings.keys().min() {
        return Err(SmilesError::UnclosedRing(*label));
    }
    Ok(parser.molecule)
}

/// Locates the first placeholder and the atoms that define its bond geometry.
pub fn attachment_site(molecule: &Molecule) -> Option<AttachmentSite> {
    let placeholder = molecule.atoms().iter().position(Atom::is_placeholder)?;
    let attached = *molecule.neighbors(placeholder).first()?;
    let neighbour = molecule
        .neighbors(attached)
        .into_iter()
        .find(|&i| i != placeholder && molecule.atom(i).is_some_and(|a| !a.is_placeholder()));
    Some(AttachmentSite {
        placeholder,
        attached,
        neighbour,
    })
}

#[derive(Default)]
struct Parser {
    molecule: Molecule,
    aromatic: Vec<bool>,
    previous: Option<usize>,
    branches: Vec<usize>,
    pending_bond: Option<(BondOrder, usize)>,
    rings: HashMap<u32, (usize, Option<BondOrder>)>,
}

impl Parser {
    fn add_atom(&mut self, element: &str, aromatic: bool) -> Result<(), SmilesError> {
        let index = self.molecule.len();
        let name = if element == "*" {
            element.to_string()
        } else {
            format!("{}{}", element, index + 1)
        };
        self.molecule.add_atom(Atom::new(&name, element, Point3::origin()));
        self.aromatic.push(aromatic);
        if let Some(previous) = self.previous {
            let explicit = self.pending_bond.take().map(|(order, _)| order);
            let order = self.resolve_order(previous, index, explicit);
            self.molecule.add_bond(previous, index, order)?;
        }
        self.previous = Some(index);
        Ok(())
    }

    fn ring_closure(&mut self, label: u32, position: usize) -> Result<(), SmilesError> {
        let current = self
            .previous
            .ok_or(SmilesError::UnexpectedCharacter { position, character: '%' })?;
        let explicit = self.pending_bond.take().map(|(order, _)| order);
        match self.rings.remove(&label) {
            Some((opened, opening_bond)) => {
                let order = self.resolve_order(opened, current, explicit.or(opening_bond));
                self.molecule.add_bond(opened, current, order)?;
            }
            None => {
                self.rings.insert(label, (current, explicit));
            }
        }
        Ok(())
    }

    fn resolve_order(&self, a: usize, b: usize, explicit: Option<BondOrder>) -> BondOrder {
        match explicit {
            Some(order) => order,
            None if self.aromatic[a] && self.aromatic[b] => BondOrder::Aromatic,
            None => BondOrder::Single,
        }
    }
}

fn bond_symbol(c: char) -> BondOrder {
    match c {
        '=' => BondOrder::Double,
        '#' => BondOrder::Triple,
        ':' => BondOrder::Aromatic,
        _ => BondOrder::Single,
    }
}

fn organic_element(rest: &[char]) -> Option<(&'static str, bool, usize)> {
    let next = rest.get(1).copied();
    let found = match (rest[0], next) {
        ('C', Some('l')) => ("Cl", false, 2),
        ('B', Some('r')) => ("Br", false, 2),
        ('B', _) => ("B", false, 1),
        ('C', _) => ("C", false, 1),
        ('N', _) => ("N", false, 1),
        ('O', _) => ("O", false, 1),
        ('P', _) => ("P", false, 1),
        ('S', _) => ("S", false, 1),
        ('F', _) => ("F", false, 1),
        ('I', _) => ("I", false, 1),
        ('b', _) => ("B", true, 1),
        ('c', _) => ("C", true, 1),
        ('n', _) => ("N", true, 1),
        ('o', _) => ("O", true, 1),
        ('p', _) => ("P", true, 1),
        ('s', _) => ("S", true, 1),
        ('*', _) => ("*", false, 1),
        _ => return None,
    };
    Some(found)
}

/// Element symbol of a bracket atom body such as `13CH3`, `nH` or `Cl-`.
fn bracket_element(body: &[char]) -> Option<(String, bool)> {
    let mut chars = body.iter().copied().skip_while(char::is_ascii_digit).peekable();
    let first = chars.next()?;
    if first == '*' {
        return Some(("*".to_string(), false));
    }
    if first.is_ascii_lowercase() {
        let mut symbol = first.to_ascii_uppercase().to_string();
        if matches!((first, chars.peek()), ('s', Some('e')) | ('a', Some('s'))) {
            symbol.extend(chars.next());
        }
        return Some((symbol, true));
    }
    if !first.is_ascii_uppercase() {
        return None;
    }
    let mut symbol = first.to_string();
    if let Some(&second) = chars.peek() {
        if second.is_ascii_lowercase() {
            symbol.push(second);
        }
    }
    Some((symbol, false))
}
