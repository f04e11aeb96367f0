use ndarray::Array1;
use rand::Rng;

/// Binomial crossover starting from a copy of `target`.
///
/// Each dimension takes the mutant's value with probability `cr`. When no
/// draw succeeded, exactly one uniformly chosen dimension is forced, so the
/// trial always carries at least one mutant component.
pub(crate) fn binomial_crossover<R: Rng + ?Sized>(
    target: &Array1<f64>,
    mutant: &Array1<f64>,
    cr: f64,
    rng: &mut R,
) -> Array1<f64> {
    let n = target.len();
    let mut trial = target.clone();
    let mut crossed = false;
    for j in 0..n {
        if rng.random::<f64>() < cr {
            trial[j] = mutant[j];
            crossed = true;
        }
    }
    if !crossed {
        let jrand = rng.random_range(0..n);
        trial[jrand] = mutant[jrand];
    }
    trial
}
