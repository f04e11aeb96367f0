use std::sync::Arc;

use ndarray::Array1;
use parking_lot::Mutex;
use simtune_de::{DEConfigBuilder, DEIntermediate, differential_evolution};

fn shifted_square(x: &Array1<f64>) -> f64 {
    (x[0] - 5.0).powi(2)
}

#[test]
fn test_de_one_dimension_four_individuals_three_generations() {
    let history = Arc::new(Mutex::new(Vec::new()));
    let h = history.clone();
    let config = DEConfigBuilder::new()
        .seed(2024)
        .popsize(4)
        .maxiter(3)
        .mutation(0.5)
        .recombination(0.9)
        .callback(Box::new(move |it: &DEIntermediate<'_>| h.lock().push(it.fun)))
        .build();

    let report = differential_evolution(&shifted_square, &[(1.0, 10.0)], config).unwrap();

    let history = history.lock();
    assert_eq!(history.len(), 4);
    for w in history.windows(2) {
        assert!(w[1] <= w[0], "best fitness increased: {:?}", *history);
    }
    assert!(report.x[0] >= 1.0 && report.x[0] <= 10.0);
    assert_eq!(report.nit, 3);
    assert_eq!(report.nfev, 16);
    assert_eq!(report.objective(), Some(report.fun));
    assert!((shifted_square(&report.x) - report.fun).abs() < 1e-12);
}

#[test]
fn test_de_sphere_converges() {
    let sphere = |x: &Array1<f64>| -> f64 { x.iter().map(|&xi| xi * xi).sum() };
    let config = DEConfigBuilder::new()
        .seed(31)
        .maxiter(300)
        .popsize(30)
        .mutation(0.5)
        .recombination(0.9)
        .build();
    let report = differential_evolution(&sphere, &[(-5.0, 5.0); 4], config).unwrap();
    assert!(report.success);
    assert!(report.fun < 1e-6, "sphere not minimized: {}", report.fun);
}

#[test]
fn test_de_sequential_and_parallel_agree() {
    let sum = |x: &Array1<f64>| -> f64 { x.sum() };
    let run = |parallel: bool| {
        let config = DEConfigBuilder::new()
            .seed(77)
            .maxiter(20)
            .popsize(12)
            .enable_parallel(parallel)
            .parallel_threads(3)
            .build();
        differential_evolution(&sum, &[(0.0, 1.0); 5], config).unwrap()
    };
    let a = run(true);
    let b = run(false);
    assert_eq!(a.x, b.x);
    assert_eq!(a.fun, b.fun);
    assert_eq!(a.population, b.population);
}
