//! Overlap engine: turns interval sets into hypergeometric parameters and
//! 2×2 contingency tables.
//!
//! Counting happens over **universe units**. In interval mode a unit is one
//! interval of the resolved background (a merged universe interval, or a
//! gene locus when the background is gene based); every count is a number
//! of units, so all margins come from the same population. In base-pair mode
//! (LOA only) a unit is one base of the merged universe.
//!
//! Units only fix the margins. Whether the foreground overlaps a tested
//! feature (a track interval, a gene-set locus) is decided between the two
//! intervals themselves under the request's [`OverlapCriteria`]: see
//! [`UnitSpace::feature_hits`].

use epilap_core::{Annotated, EpilapError, Result};
use epilap_omics::genome_arithmetic::{intersect_merged, total_bp};
use epilap_omics::{
    GenomicInterval, IntervalIndex, IntervalSet, OverlapCriteria, SizeMode, Universe,
    UniverseCoverage,
};
use epilap_stats::ContingencyTable;
use log::debug;

/// Units of a background, indexed for overlap queries.
#[derive(Debug, Clone)]
pub struct UnitSpace {
    /// Sorted, distinct.
    units: Vec<GenomicInterval>,
    index: IntervalIndex,
}

impl UnitSpace {
    /// One unit per merged universe interval.
    pub fn from_universe(universe: &Universe) -> Result<Self> {
        Self::from_sorted(universe.intervals().to_vec())
    }

    /// One unit per distinct locus. Overlapping loci stay separate units.
    pub fn from_loci(loci: &IntervalSet) -> Result<Self> {
        if loci.is_empty() {
            return Err(EpilapError::validation(format!(
                "background '{}' has no loci",
                loci.name()
            )));
        }
        let mut units = loci.intervals().to_vec();
        units.sort_unstable();
        units.dedup();
        Self::from_sorted(units)
    }

    fn from_sorted(units: Vec<GenomicInterval>) -> Result<Self> {
        let index = IntervalIndex::build(&units)?;
        Ok(Self { units, index })
    }

    /// Number of units, N.
    pub fn len(&self) -> u64 {
        self.units.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[GenomicInterval] {
        &self.units
    }

    /// Units touched by at least one interval of `query`, each query
    /// interval first widened by `flank` bases on both sides.
    pub fn hits(
        &self,
        query: &[GenomicInterval],
        criteria: &OverlapCriteria,
        flank: u64,
    ) -> Result<UnitMask> {
        let mut mask = vec![false; self.units.len()];
        for iv in query {
            self.mark(&mut mask, &iv.widen(flank), criteria)?;
        }
        Ok(UnitMask(mask))
    }

    /// Footprint of a feature set on the units, seen from the foreground.
    ///
    /// A unit is *joint* when a foreground interval (widened by `flank`)
    /// overlaps a feature inside it under `criteria`. The returned feature
    /// mask holds the joint units plus the feature units the foreground does
    /// not touch; feature units where the foreground is present but fails
    /// `criteria` count as foreground-only. `foreground_units` must be the
    /// mask [`hits`](Self::hits) built from the same intervals and flank.
    pub fn feature_hits(
        &self,
        foreground: &[GenomicInterval],
        foreground_units: &UnitMask,
        features: &[GenomicInterval],
        criteria: &OverlapCriteria,
        flank: u64,
    ) -> Result<UnitMask> {
        if foreground_units.0.len() != self.units.len() {
            return Err(EpilapError::Consistency(format!(
                "foreground mask has {} units, unit space {}",
                foreground_units.0.len(),
                self.units.len()
            )));
        }
        let touched = self.hits(features, &OverlapCriteria::default(), 0)?;
        let index = IntervalIndex::build(features)?;
        let mut joint = vec![false; self.units.len()];
        for iv in foreground {
            let iv = iv.widen(flank);
            for feature in index.overlaps(&iv, criteria) {
                if let Some(shared) = iv.intersect(feature) {
                    self.mark(&mut joint, &shared, &OverlapCriteria::default())?;
                }
            }
        }
        let mask = joint
            .iter()
            .zip(&touched.0)
            .zip(&foreground_units.0)
            .map(|((&joint, &feature), &fg)| (joint && fg) || (feature && !fg))
            .collect();
        Ok(UnitMask(mask))
    }

    fn mark(&self, mask: &mut [bool], iv: &GenomicInterval, criteria: &OverlapCriteria) -> Result<()> {
        for unit in self.index.overlaps(iv, criteria) {
            let pos = self.units.binary_search(unit).map_err(|_| {
                EpilapError::Consistency(format!("indexed unit {unit} missing from unit list"))
            })?;
            mask[pos] = true;
        }
        Ok(())
    }
}

/// Membership of each unit of a [`UnitSpace`] in some subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMask(Vec<bool>);

impl UnitMask {
    pub fn count(&self) -> u64 {
        self.0.iter().filter(|&&x| x).count() as u64
    }

    /// Units whose membership in `self` is `in_self` and in `other` is `in_other`.
    fn count_where(&self, other: &UnitMask, in_self: bool, in_other: bool) -> u64 {
        self.0
            .iter()
            .zip(&other.0)
            .filter(|&(&x, &y)| x == in_self && y == in_other)
            .count() as u64
    }
}

/// Parameters of a hypergeometric enrichment test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HypergeometricCounts {
    /// N: units in the universe.
    pub population: u64,
    /// K: units in the category.
    pub successes: u64,
    /// n: units hit by the foreground.
    pub draws: u64,
    /// k: units hit by the foreground and in the category.
    pub observed: u64,
}

impl HypergeometricCounts {
    /// Counts of foreground and category masks over the same unit space.
    pub fn from_masks(foreground: &UnitMask, category: &UnitMask) -> Result<Self> {
        if foreground.0.len() != category.0.len() {
            return Err(EpilapError::Consistency(format!(
                "masks over different unit spaces ({} vs {} units)",
                foreground.0.len(),
                category.0.len()
            )));
        }
        let counts = Self {
            population: foreground.0.len() as u64,
            successes: category.count(),
            draws: foreground.count(),
            observed: foreground.count_where(category, true, true),
        };
        counts.check()?;
        Ok(counts)
    }

    fn check(&self) -> Result<()> {
        let Self {
            population: big_n,
            successes: big_k,
            draws: n,
            observed: k,
        } = *self;
        if big_k > big_n || n > big_n || k > n.min(big_k) || n - k > big_n - big_k {
            return Err(EpilapError::Consistency(format!(
                "impossible hypergeometric counts N={big_n} K={big_k} n={n} k={k}"
            )));
        }
        Ok(())
    }

    /// `(k/n) / (K/N)`, 0 when the foreground or the category is empty.
    pub fn fold_enrichment(&self) -> f64 {
        if self.draws == 0 || self.successes == 0 {
            return 0.0;
        }
        (self.observed as f64 / self.draws as f64)
            / (self.successes as f64 / self.population as f64)
    }
}

/// 2×2 table of foreground vs track membership over the unit space.
///
/// `a + b` equals the foreground unit count and `c + d` the remaining units;
/// anything else is reported as a consistency error.
pub fn contingency_table(foreground: &UnitMask, track: &UnitMask) -> Result<ContingencyTable> {
    if foreground.0.len() != track.0.len() {
        return Err(EpilapError::Consistency(format!(
            "masks over different unit spaces ({} vs {} units)",
            foreground.0.len(),
            track.0.len()
        )));
    }
    let table = ContingencyTable::new(
        foreground.count_where(track, true, true),
        foreground.count_where(track, true, false),
        foreground.count_where(track, false, true),
        foreground.count_where(track, false, false),
    );
    let total = foreground.0.len() as u64;
    check_margins(&table, foreground.count(), total)?;
    Ok(table)
}

/// 2×2 table in base pairs inside `universe`.
///
/// `a` = foreground bp covered by the track, `b` = remaining foreground bp,
/// `c` = track bp outside the foreground, `d` = the rest of the universe.
/// Strand and overlap-fraction rules do not apply to base counts.
pub fn contingency_table_bp(
    universe: &Universe,
    foreground: &[GenomicInterval],
    track: &[GenomicInterval],
) -> Result<ContingencyTable> {
    let big_n = universe.size(SizeMode::BasePairs);
    let fg = universe.restrict(foreground);
    let tr = universe.restrict(track);
    let n = total_bp(&fg);
    let a = total_bp(&intersect_merged(&fg, &tr));
    let track_bp = total_bp(&tr);

    let underflow = |what: &str| {
        EpilapError::Consistency(format!(
            "base-pair table underflow computing {what} (N={big_n}, n={n}, a={a}, track={track_bp})"
        ))
    };
    let b = n.checked_sub(a).ok_or_else(|| underflow("b"))?;
    let c = track_bp.checked_sub(a).ok_or_else(|| underflow("c"))?;
    let d = big_n
        .checked_sub(n)
        .and_then(|rest| rest.checked_sub(c))
        .ok_or_else(|| underflow("d"))?;

    let table = ContingencyTable::new(a, b, c, d);
    check_margins(&table, n, big_n)?;
    Ok(table)
}

fn check_margins(table: &ContingencyTable, foreground: u64, total: u64) -> Result<()> {
    if table.row1() != foreground || table.total() != total {
        return Err(EpilapError::Consistency(format!(
            "contingency table {table} does not match foreground={foreground}, universe={total}"
        )));
    }
    Ok(())
}

/// A resolved background: the merged universe plus the units counted in it.
#[derive(Debug, Clone)]
pub struct ResolvedBackground {
    pub universe: Universe,
    pub units: UnitSpace,
}

impl ResolvedBackground {
    /// Background made of gene loci: each distinct locus is a unit.
    pub fn from_loci(loci: &IntervalSet) -> Result<Self> {
        let units = UnitSpace::from_loci(loci)?;
        let universe = Universe::from_set(loci)?;
        debug!(
            "gene background: {} loci, {} merged universe intervals",
            units.len(),
            universe.size(SizeMode::IntervalCount)
        );
        Ok(Self { universe, units })
    }

    /// Background made of universe intervals.
    pub fn from_universe(universe: Universe) -> Result<Self> {
        let units = UnitSpace::from_universe(&universe)?;
        Ok(Self { universe, units })
    }

    /// Size in the requested unit.
    pub fn size(&self, unit: SizeMode) -> u64 {
        match unit {
            SizeMode::IntervalCount => self.units.len(),
            SizeMode::BasePairs => self.universe.size(SizeMode::BasePairs),
        }
    }

    /// How many foreground intervals touch the background.
    pub fn coverage_of(&self, foreground: &IntervalSet) -> UniverseCoverage {
        self.universe.coverage_of(foreground)
    }
}
