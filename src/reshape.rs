/// Square image view of a 1-D density frame.
///
/// Every row of the `M×M` view is the same borrowed slice, so expanding a
/// frame costs nothing and only the frame on screen is ever expanded.
#[derive(Debug, Clone, Copy)]
pub struct ExpandedFrame<'a> {
    row: &'a [f64],
}

pub fn expand(frame: &[f64]) -> ExpandedFrame<'_> {
    ExpandedFrame { row: frame }
}

impl<'a> ExpandedFrame<'a> {
    /// (rows, cols); both equal the frame length.
    pub fn shape(&self) -> (usize, usize) {
        (self.row.len(), self.row.len())
    }

    pub fn row(&self, r: usize) -> Option<&'a [f64]> {
        (r < self.row.len()).then_some(self.row)
    }

    #[cfg(test)]
    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> + 'a {
        let row = self.row;
        std::iter::repeat(row).take(row.len())
    }

    #[cfg(test)]
    pub fn get(&self, r: usize, c: usize) -> Option<f64> {
        self.row(r)?.get(c).copied()
    }

    /// Materialize the view. Allocates `M²` values.
    #[cfg(test)]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(|r| r.to_vec()).collect()
    }
}
