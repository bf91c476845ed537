//! Gene annotation and named gene sets.
//!
//! A [`GeneAnnotation`] is the reference genome's gene catalogue; it turns
//! gene symbols into loci so that gene lists and [`GeneSet`]s can be scored
//! with the same interval machinery as raw interval submissions.

use std::collections::{BTreeSet, HashMap};

use epilap_core::{Annotated, EpilapError, Result, Summarizable};

use crate::genomic::GenomicInterval;
use crate::interval::{IntervalSet, SetRole};

/// A gene locus from the reference annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gene {
    pub name: String,
    pub locus: GenomicInterval,
}

impl Gene {
    pub fn new(name: impl Into<String>, locus: GenomicInterval) -> Result<Self> {
        locus.validate()?;
        Ok(Self {
            name: name.into(),
            locus,
        })
    }
}

/// A named set of gene symbols, optionally labelled with its collection
/// (e.g. `"H"` for hallmark, `"C2"` for curated sets).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneSet {
    pub name: String,
    pub collection: Option<String>,
    pub genes: Vec<String>,
}

impl GeneSet {
    pub fn new<I, S>(name: impl Into<String>, genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            collection: None,
            genes: genes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Distinct gene symbols.
    pub fn unique_genes(&self) -> BTreeSet<&str> {
        self.genes.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl Annotated for GeneSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }
}

/// Loci resolved from gene symbols, plus the symbols that had no locus.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGenes {
    pub loci: IntervalSet,
    pub missing: Vec<String>,
}

/// Gene catalogue of a reference genome, searchable by symbol.
///
/// A symbol may map to several loci (paralogous copies, PAR genes); all of
/// them are returned.
#[derive(Debug, Clone, Default)]
pub struct GeneAnnotation {
    genes: Vec<Gene>,
    by_name: HashMap<String, Vec<usize>>,
}

impl GeneAnnotation {
    pub fn new(genes: Vec<Gene>) -> Result<Self> {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, gene) in genes.iter().enumerate() {
            gene.locus.validate()?;
            if gene.name.is_empty() {
                return Err(EpilapError::validation(format!(
                    "gene at {} has an empty name",
                    gene.locus
                )));
            }
            by_name.entry(gene.name.clone()).or_default().push(idx);
        }
        Ok(Self { genes, by_name })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Loci annotated for `name`, empty when unknown.
    pub fn loci(&self, name: &str) -> impl Iterator<Item = &GenomicInterval> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&idx| &self.genes[idx].locus)
    }

    /// Resolve distinct symbols to loci, in first-seen order.
    pub fn resolve<'a>(
        &self,
        set_name: &str,
        names: impl IntoIterator<Item = &'a str>,
    ) -> ResolvedGenes {
        let mut seen = BTreeSet::new();
        let mut loci = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            if !seen.insert(name) {
                continue;
            }
            let before = loci.len();
            loci.extend(self.loci(name).copied());
            if loci.len() == before {
                missing.push(name.to_string());
            }
        }
        ResolvedGenes {
            loci: IntervalSet::from_validated(set_name.to_string(), SetRole::Foreground, loci),
            missing,
        }
    }

    /// Every annotated locus, in catalogue order.
    pub fn all_loci(&self, set_name: &str) -> IntervalSet {
        IntervalSet::from_validated(
            set_name.to_string(),
            SetRole::Background,
            self.genes.iter().map(|g| g.locus).collect(),
        )
    }
}

impl Summarizable for GeneAnnotation {
    fn summary(&self) -> String {
        format!(
            "GeneAnnotation: {} loci, {} symbols",
            self.genes.len(),
            self.by_name.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomic::Chromosome;

    fn gene(name: &str, c: u8, start: u64, end: u64) -> Gene {
        Gene::new(
            name,
            GenomicInterval::new(Chromosome::autosome(c).unwrap(), start, end).unwrap(),
        )
        .unwrap()
    }

    fn catalogue() -> GeneAnnotation {
        GeneAnnotation::new(vec![
            gene("TP53", 17, 7_668_401, 7_687_550),
            gene("BRCA1", 17, 43_044_294, 43_125_483),
            gene("CSF2RA", 1, 1_000, 2_000),
            gene("CSF2RA", 2, 1_000, 2_000),
        ])
        .unwrap()
    }

    #[test]
    fn resolve_known_and_missing() {
        let ann = catalogue();
        let resolved = ann.resolve("fg", ["TP53", "NOPE", "TP53", "CSF2RA"]);
        assert_eq!(resolved.loci.len(), 3);
        assert_eq!(resolved.missing, vec!["NOPE".to_string()]);
        assert_eq!(resolved.loci.name(), "fg");
    }

    #[test]
    fn all_loci_and_summary() {
        let ann = catalogue();
        assert_eq!(ann.all_loci("genes").len(), 4);
        assert_eq!(ann.summary(), "GeneAnnotation: 4 loci, 3 symbols");
        assert_eq!(ann.loci("BRCA1").count(), 1);
        assert_eq!(ann.loci("BRCA2").count(), 0);
    }

    #[test]
    fn empty_name_rejected() {
        let g = Gene {
            name: String::new(),
            locus: GenomicInterval::new(Chromosome::X, 0, 10).unwrap(),
        };
        assert!(GeneAnnotation::new(vec![g]).is_err());
    }

    #[test]
    fn gene_set_helpers() {
        let gs = GeneSet::new("HALLMARK_P53_PATHWAY", ["TP53", "MDM2", "TP53"]).with_collection("H");
        assert_eq!(gs.len(), 3);
        assert_eq!(gs.unique_genes().len(), 2);
        assert_eq!(gs.collection(), Some("H"));
    }
}
