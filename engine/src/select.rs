use rand::Rng;
use rand::rngs::StdRng;

/// Picks one slice index from a surviving frame. The runtime owns a single
/// seedable stream shared between selection and `rnd` arithmetic, so a
/// selector draws from the stream it is handed rather than its own.
pub trait Selector {
    fn select(&mut self, len: usize, rng: &mut StdRng) -> usize;
}

/// The default: uniform over the surviving slices.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformSelector;

impl Selector for UniformSelector {
    fn select(&mut self, len: usize, rng: &mut StdRng) -> usize {
        if len <= 1 { 0 } else { rng.gen_range(0..len) }
    }
}

/// Always the first slice. Deterministic runs for tests and drivers that
/// want reproducibility without seeding.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstSelector;

impl Selector for FirstSelector {
    fn select(&mut self, _len: usize, _rng: &mut StdRng) -> usize {
        0
    }
}
