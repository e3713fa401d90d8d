use crate::cli::CatalogArgs;
use crate::error::Result;
use reanimator::core::catalog::DefinitionCatalog;
use std::fmt::Write;
use tracing::info;

pub fn run(args: CatalogArgs) -> Result<()> {
    let catalog = match &args.file {
        Some(path) => {
            info!("Loading catalog from {:?}", path);
            DefinitionCatalog::load(path)?
        }
        None => DefinitionCatalog::builtin(),
    };
    print!("{}", render(&catalog));
    Ok(())
}

/// Lists warheads in matching order, then covalent residues.
fn render(catalog: &DefinitionCatalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Warheads (first match wins):");
    for (i, warhead) in catalog.warheads().iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {:<18} {:<16} [{}]",
            i + 1,
            warhead.name,
            warhead.covalent,
            warhead.covalent_atomnames.join(", ")
        );
    }
    let _ = writeln!(out, "Covalent residues:");
    for residue in catalog.residues() {
        let _ = writeln!(
            out,
            "      {:<18} {:<16} [{}]",
            residue.residue,
            residue.smiles,
            residue.atomnames.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_rendered_in_matching_order() {
        let text = render(&DefinitionCatalog::builtin());
        let nitrile = text.find("nitrile").unwrap();
        let acrylamide = text.find("acrylamide").unwrap();
        let chloroacetamide = text.find("chloroacetamide").unwrap();
        assert!(nitrile < acrylamide && acrylamide < chloroacetamide);
        assert!(text.contains("CYS"));
        assert!(text.contains("[CONN3, SG, CB]"));
    }
}
