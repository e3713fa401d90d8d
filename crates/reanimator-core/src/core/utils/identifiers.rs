use phf::{Set, phf_set};
use regex::Regex;
use std::sync::LazyLock;

/// Residue code assigned by structure writers to residues nobody named.
pub const UNSPECIFIED_LIGAND_CODE: &str = "UNL";

/// Atom name given to placeholder (dummy) atoms in PDB output.
pub const PLACEHOLDER_ATOM_NAME: &str = "R";

/// Names of the atoms that stand for the bond to the receptor rather than a real ligand atom.
static CONNECTION_ATOM_NAMES: Set<&'static str> = phf_set! {
    "CONN", "CONN1", "CONN2", "CONN3", "LINK",
};

static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\W_.-]+").expect("slug pattern is valid"));

pub fn is_connection_atom(atom_name: &str) -> bool {
    CONNECTION_ATOM_NAMES.contains(atom_name.trim())
}

/// Sorted list of the connection atom names, for display.
pub fn connection_atom_names() -> Vec<&'static str> {
    let mut names: Vec<_> = CONNECTION_ATOM_NAMES.iter().copied().collect();
    names.sort_unstable();
    names
}

/// Collapses every run of non-word characters, underscores, dots and dashes into one `-`.
pub fn slugify(name: &str) -> String {
    SLUG_SEPARATORS.replace_all(name, "-").into_owned()
}

/// File stem used for the `index`-th reference fragment.
pub fn hit_file_stem(stored_name: Option<&str>, index: usize) -> String {
    match stored_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("hit{}", index),
    }
}

/// Pads an atom name into the four-character PDB name field.
///
/// Names shorter than four characters are shifted one column right, as the
/// format reserves the first column for two-letter element symbols.
pub fn pad_atom_name(name: &str) -> String {
    let name = name.trim();
    if name.len() >= 4 {
        name.chars().take(4).collect()
    } else {
        format!(" {:<3}", name)
    }
}
