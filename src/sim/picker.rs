//! Avoid-repeat random choice over a fixed sample set

use rand::Rng;

/// Picks a random sample, never the same index twice in a row
///
/// Each call site owns its own picker; the only state is the last choice.
#[derive(Debug, Clone)]
pub struct SamplePicker<T> {
    samples: Vec<T>,
    last: Option<usize>,
}

impl<T> SamplePicker<T> {
    pub fn new(samples: Vec<T>) -> Self {
        Self { samples, last: None }
    }

    /// Index of the next choice, `None` for an empty set
    pub fn next_index(&mut self, rng: &mut impl Rng) -> Option<usize> {
        let len = self.samples.len();
        let index = match (len, self.last) {
            (0, _) => return None,
            (1, _) => 0,
            (_, None) => rng.random_range(0..len),
            // Draw from the other len-1 slots and skip over the last one
            (_, Some(last)) => {
                let draw = rng.random_range(0..len - 1);
                if draw >= last { draw + 1 } else { draw }
            }
        };
        self.last = Some(index);
        Some(index)
    }

    pub fn next(&mut self, rng: &mut impl Rng) -> Option<&T> {
        let index = self.next_index(rng)?;
        self.samples.get(index)
    }
}
