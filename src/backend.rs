//! Selection of how per-voxel passes are executed.

use rayon::prelude::*;

/// How a per-voxel computation is scheduled.
///
/// Every pass is expressed as a pure function of the voxel index that only
/// reads immutable inputs, so the backends produce identical values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeBackend {
    Serial,
    Parallel,
}

impl ComputeBackend {
    /// Fills the given buffer by evaluating `compute_value` for each flat
    /// index in memory order.
    pub fn fill<T, C>(self, buffer: &mut [T], compute_value: C)
    where
        T: Send,
        C: Fn(usize) -> T + Sync,
    {
        match self {
            Self::Serial => buffer
                .iter_mut()
                .enumerate()
                .for_each(|(idx, value)| *value = compute_value(idx)),
            Self::Parallel => buffer
                .par_iter_mut()
                .enumerate()
                .for_each(|(idx, value)| *value = compute_value(idx)),
        }
    }

    /// Evaluates `compute_item` for every element of `items` and collects
    /// the results in the same order.
    pub fn map_collect<T, U, C>(self, items: &[T], compute_item: C) -> Vec<U>
    where
        T: Sync,
        U: Send,
        C: Fn(usize, &T) -> U + Sync + Send,
    {
        match self {
            Self::Serial => items
                .iter()
                .enumerate()
                .map(|(idx, item)| compute_item(idx, item))
                .collect(),
            Self::Parallel => items
                .par_iter()
                .enumerate()
                .map(|(idx, item)| compute_item(idx, item))
                .collect(),
        }
    }

    /// Computes the maximum of `compute_value` over the flat indices
    /// `0..n_values`, or zero if there are none.
    pub fn max_over<C>(self, n_values: usize, compute_value: C) -> f64
    where
        C: Fn(usize) -> f64 + Sync + Send,
    {
        match self {
            Self::Serial => (0..n_values).map(compute_value).fold(0.0, f64::max),
            Self::Parallel => (0..n_values)
                .into_par_iter()
                .map(compute_value)
                .reduce(|| 0.0, f64::max),
        }
    }
}

impl Default for ComputeBackend {
    fn default() -> Self {
        Self::Parallel
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn backends_produce_identical_buffers() {
        let compute = |idx: usize| (idx as f64).sqrt() / 7.0;
        let mut serial = vec![0.0; 1000];
        let mut parallel = vec![0.0; 1000];
        ComputeBackend::Serial.fill(&mut serial, compute);
        ComputeBackend::Parallel.fill(&mut parallel, compute);
        assert_eq!(serial, parallel);
        assert_eq!(
            ComputeBackend::Serial.max_over(1000, compute),
            ComputeBackend::Parallel.max_over(1000, compute)
        );
    }

    #[test]
    fn maximum_over_nothing_is_zero() {
        assert_eq!(ComputeBackend::Parallel.max_over(0, |_| 1.0), 0.0);
    }
}
