use crate::rng::RandomSource;

/// Cumulative-weight index over a sequence of positive weights.
///
/// Position `i` covers the half-open interval
/// `[cumulative[i - 1], cumulative[i])`, so a draw that lands exactly on a
/// boundary belongs to the following position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightedIndex {
    cumulative: Vec<f64>,
    total: f64,
}

impl WeightedIndex {
    pub fn new<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut total = 0.0;
        let cumulative = weights
            .into_iter()
            .map(|weight| {
                total += weight.max(0.0);
                total
            })
            .collect();
        Self { cumulative, total }
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Position owning `draw`, where `draw` is in `[0, total)`.
    pub fn select(&self, draw: f64) -> Option<usize> {
        if self.total <= 0.0 {
            return None;
        }
        let position = self.cumulative.partition_point(|&bound| bound <= draw);
        (position < self.cumulative.len()).then_some(position)
    }

    pub fn sample(&self, rng: &mut dyn RandomSource) -> Option<usize> {
        if self.total <= 0.0 {
            return None;
        }
        let draw = rng.unit() * self.total;
        // Rounding can push `draw` onto `total`; fold it into the last
        // weighted position.
        self.select(draw).or_else(|| {
            Some(
                self.cumulative
                    .partition_point(|&bound| bound < self.total),
            )
        })
    }
}
