//! Centralized data tables consulted by the normalizer, the KB clients, and
//! the preprocessor. Kept as data rather than code so test suites can extend
//! them without touching matching logic (`spec.md` §9).

/// Three-letter amino acid code to one-letter, including the stop codon (`Ter`/`*`).
pub(crate) const AMINO_ACID_3TO1: &[(&str, char)] = &[
    ("ALA", 'A'),
    ("ARG", 'R'),
    ("ASN", 'N'),
    ("ASP", 'D'),
    ("CYS", 'C'),
    ("GLN", 'Q'),
    ("GLU", 'E'),
    ("GLY", 'G'),
    ("HIS", 'H'),
    ("ILE", 'I'),
    ("LEU", 'L'),
    ("LYS", 'K'),
    ("MET", 'M'),
    ("PHE", 'F'),
    ("PRO", 'P'),
    ("SER", 'S'),
    ("THR", 'T'),
    ("TRP", 'W'),
    ("TYR", 'Y'),
    ("VAL", 'V'),
    ("TER", '*'),
];

pub(crate) fn three_to_one(code: &str) -> Option<char> {
    let upper = code.to_ascii_uppercase();
    AMINO_ACID_3TO1
        .iter()
        .find(|(three, _)| *three == upper)
        .map(|(_, one)| *one)
}

/// Gene symbols that different knowledge bases spell differently. Each entry
/// lists every spelling including the canonical one; lookups are
/// case-insensitive.
pub(crate) const GENE_ALIASES: &[&[&str]] = &[
    &["ERBB2", "HER2", "HER-2", "NEU"],
    &["MET", "HGFR"],
    &["KIT", "CD117"],
    &["PDGFRA", "CD140A"],
    &["PDGFRB", "CD140B"],
    &["NTRK1", "TRKA"],
    &["NTRK2", "TRKB"],
    &["NTRK3", "TRKC"],
    &["RET", "PTC"],
    &["FGFR1", "FLT2"],
];

/// Returns every known alias for `gene` (including `gene` itself, upper-cased),
/// or a single-element vec of the upper-cased gene if it has no known aliases.
pub(crate) fn gene_aliases(gene: &str) -> Vec<String> {
    let upper = gene.to_ascii_uppercase();
    for group in GENE_ALIASES {
        if group.iter().any(|g| *g == upper) {
            return group.iter().map(|g| g.to_string()).collect();
        }
    }
    vec![upper]
}

/// Tumor-type synonym map: abbreviation/code to every full-name synonym.
/// Seeded with the cancer sites `spec.md` §4.5.1 names explicitly, plus
/// enough common oncology sites to exercise the tumor-match predicate broadly.
pub(crate) const TUMOR_TYPE_MAPPINGS: &[(&str, &[&str])] = &[
    (
        "nsclc",
        &[
            "non-small cell lung",
            "non small cell lung",
            "lung adenocarcinoma",
            "lung squamous",
            "nsclc",
        ],
    ),
    ("sclc", &["small cell lung", "sclc"]),
    (
        "crc",
        &["colorectal", "colon", "rectal", "colorectal cancer"],
    ),
    ("mel", &["melanoma", "cutaneous melanoma", "mel"]),
    (
        "pancreatic",
        &["pancreatic", "pancreas", "pancreatic adenocarcinoma"],
    ),
    ("renal", &["renal", "kidney", "renal cell carcinoma", "rcc"]),
    ("breast", &["breast", "breast cancer", "mammary"]),
    (
        "gist",
        &["gastrointestinal stromal", "gist"],
    ),
    ("thyroid", &["thyroid", "papillary thyroid", "medullary thyroid"]),
    ("hcc", &["hepatocellular", "liver cancer", "hcc"]),
    ("ovarian", &["ovarian", "ovary"]),
    (
        "gastric",
        &["gastric", "stomach", "gastroesophageal"],
    ),
    ("glioma", &["glioma", "glioblastoma", "astrocytoma"]),
    ("aml", &["acute myeloid leukemia", "aml"]),
    ("cml", &["chronic myeloid leukemia", "cml"]),
    (
        "all",
        &["acute lymphoblastic leukemia", "acute lymphocytic leukemia"],
    ),
    ("mm", &["multiple myeloma"]),
    ("hnscc", &["head and neck", "hnscc"]),
    ("prostate", &["prostate", "prostatic"]),
    ("bladder", &["bladder", "urothelial"]),
    ("esophageal", &["esophageal", "esophagus"]),
    ("endometrial", &["endometrial", "uterine"]),
    ("cervical", &["cervical", "cervix"]),
    ("sarcoma", &["sarcoma", "soft tissue sarcoma"]),
    ("cholangiocarcinoma", &["cholangiocarcinoma", "bile duct"]),
];

/// `(gene, tumor-substring)` pairs treated as investigational-only
/// regardless of the evidence otherwise aggregated; `"*"` matches any tumor
/// type. Based on `spec.md` §4.5.4's example list (`apc`/colorectal uses
/// `"colorectal"` and `"colon"` rather than the `"crc"` synonym key, since
/// `is_investigational_only` matches via a raw substring check against the
/// tumor-type string, not through the `TUMOR_TYPE_MAPPINGS` synonym map).
pub(crate) const INVESTIGATIONAL_ONLY_PAIRS: &[(&str, &str)] = &[
    ("kras", "pancreatic"),
    ("nras", "mel"),
    ("tp53", "*"),
    ("apc", "colorectal"),
    ("apc", "colon"),
    ("vhl", "renal"),
    ("smad4", "pancreatic"),
    ("cdkn2a", "mel"),
    ("arid1a", "*"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_to_one_handles_stop_codon() {
        assert_eq!(three_to_one("Ter"), Some('*'));
        assert_eq!(three_to_one("val"), Some('V'));
        assert_eq!(three_to_one("Xyz"), None);
    }

    #[test]
    fn gene_aliases_returns_whole_group() {
        let aliases = gene_aliases("her2");
        assert!(aliases.contains(&"ERBB2".to_string()));
        assert!(aliases.contains(&"HER2".to_string()));
    }

    #[test]
    fn gene_aliases_falls_back_to_self_for_unknown_gene() {
        assert_eq!(gene_aliases("braf"), vec!["BRAF".to_string()]);
    }

    #[test]
    fn tumor_type_mappings_cover_spec_example_sites() {
        let keys: Vec<&str> = TUMOR_TYPE_MAPPINGS.iter().map(|(k, _)| *k).collect();
        for expected in ["nsclc", "crc", "mel", "pancreatic", "renal"] {
            assert!(keys.contains(&expected), "missing {expected}");
        }
    }
}
