use std::collections::VecDeque;

/// Rolling window of the most recent prices, oldest first
///
/// Owned by the decision path; observers get copies via `to_vec`.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    prices: VecDeque<f64>,
    max_len: usize,
}

impl PriceSeries {
    /// Create a new series
    ///
    /// # Arguments
    /// * `max_len` - Maximum number of prices to keep
    pub fn new(max_len: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(max_len + 1),
            max_len,
        }
    }

    /// Add a price, evicting the oldest if the window is full
    ///
    /// No validation: zero or negative prices are stored as given.
    pub fn append(&mut self, price: f64) {
        self.prices.push_back(price);

        while self.prices.len() > self.max_len {
            self.prices.pop_front();
        }

        // Keep the storage contiguous so indicators can borrow a plain slice
        self.prices.make_contiguous();
    }

    /// All stored prices, oldest first
    pub fn prices(&self) -> &[f64] {
        self.prices.as_slices().0
    }

    pub fn latest(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }
}
