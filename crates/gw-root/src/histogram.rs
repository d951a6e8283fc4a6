//! 1D histogram as read from a ROOT file.

/// A 1D histogram with its under/overflow cells kept in place.
///
/// Cells are indexed the way ROOT's `GetBinContent` indexes them: `0` is the
/// underflow, `1..=n_bins` are the regular bins, `n_bins + 1` the overflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Object name
    pub name: String,
    /// Object title
    pub title: String,
    /// Stored class (`TH1D`, `TH1F` or `TH1I`)
    pub class_name: String,
    /// Number of regular bins
    pub n_bins: usize,
    /// Bin edges, `n_bins + 1` values
    pub edges: Vec<f64>,
    /// Cell contents including under/overflow, `n_bins + 2` values
    pub cells: Vec<f64>,
    /// Stored number of entries (`fEntries`)
    pub entries: f64,
}

impl Histogram {
    /// Content of cell `bin` in ROOT numbering, `None` past the overflow.
    pub fn bin_content(&self, bin: usize) -> Option<f64> {
        self.cells.get(bin).copied()
    }

    /// Regular bin contents, without under/overflow.
    pub fn contents(&self) -> &[f64] {
        &self.cells[1..=self.n_bins]
    }

    /// Underflow cell.
    pub fn underflow(&self) -> f64 {
        self.cells[0]
    }

    /// Overflow cell.
    pub fn overflow(&self) -> f64 {
        self.cells[self.n_bins + 1]
    }

    /// Sum of the regular bins, plus under/overflow when `include_flows`.
    pub fn integral(&self, include_flows: bool) -> f64 {
        if include_flows { self.cells.iter().sum() } else { self.contents().iter().sum() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cutflow() -> Histogram {
        Histogram {
            name: "cut_flow".into(),
            title: "".into(),
            class_name: "TH1D".into(),
            n_bins: 3,
            edges: vec![0.0, 1.0, 2.0, 3.0],
            cells: vec![1.0, 1000.0, 800.0, 500.0, 2.0],
            entries: 2303.0,
        }
    }

    #[test]
    fn bin_numbering_follows_root() {
        let h = cutflow();
        assert_eq!(h.bin_content(0), Some(1.0));
        assert_eq!(h.bin_content(2), Some(800.0));
        assert_eq!(h.bin_content(4), Some(2.0));
        assert_eq!(h.bin_content(5), None);
        assert_eq!(h.contents(), &[1000.0, 800.0, 500.0]);
        assert_eq!((h.underflow(), h.overflow()), (1.0, 2.0));
    }

    #[test]
    fn integral_with_and_without_flows() {
        let h = cutflow();
        assert_eq!(h.integral(false), 2300.0);
        assert_eq!(h.integral(true), 2303.0);
    }
}
