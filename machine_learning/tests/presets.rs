use machine_learning::{
    arch::{Model, Sequential, presets},
    specs::ModelSpec,
};
use ndarray::{Array, Axis, IxDyn};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn build(spec: ModelSpec, rng: &mut StdRng) -> Sequential {
    let ModelSpec::Sequential { input, layers } = spec;
    Sequential::build(input, &layers, rng).unwrap()
}

fn images(rng: &mut StdRng, n: usize) -> ndarray::ArrayD<f32> {
    Array::from_shape_simple_fn(IxDyn(&[n, 3, 32, 32]), || rng.random_range(0.0..1.0))
}

#[test]
fn shallow_parameter_count() {
    let model = build(presets::shallow(10, 3.), &mut StdRng::seed_from_u64(0));
    assert_eq!(model.size(), 4_210_090);
    assert_eq!(model.summary().total_params(), 4_210_090);
}

#[test]
fn deep_parameter_count() {
    let model = build(presets::deep(10, 3.), &mut StdRng::seed_from_u64(0));
    assert_eq!(model.size(), 2_915_114);
}

#[test]
fn deep_halves_the_spatial_extent_per_block() {
    let model = build(presets::deep(10, 3.), &mut StdRng::seed_from_u64(0));
    let summary = model.summary();

    let pooled: Vec<_> = summary
        .rows()
        .iter()
        .filter(|row| row.name == "max_pool2d")
        .map(|row| row.output_shape.clone())
        .collect();

    assert_eq!(pooled, [vec![32, 16, 16], vec![64, 8, 8], vec![128, 4, 4]]);
    assert_eq!(summary.output_shape(), [10]);
}

#[test]
fn class_count_sets_the_output_width() {
    let model = build(presets::shallow(4, 3.), &mut StdRng::seed_from_u64(0));
    assert_eq!(model.summary().output_shape(), [4]);
}

#[test]
fn predictions_are_probabilities() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut model = build(presets::shallow(10, 3.), &mut rng);

    let y = model.predict(images(&mut rng, 3)).unwrap();

    assert_eq!(y.dim(), (3, 10));
    assert!(y.iter().all(|&p| (0. ..=1.).contains(&p)));
    for &sum in y.sum_axis(Axis(1)).iter() {
        assert!((sum - 1.).abs() < 1e-5);
    }
}

#[test]
fn evaluation_is_deterministic_and_training_is_not() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut model = build(presets::shallow(10, 3.), &mut rng);
    let x = images(&mut rng, 2);

    let first = model.predict(x.clone()).unwrap();
    let second = model.predict(x.clone()).unwrap();
    assert_eq!(first, second);

    let a = model.forward(x.clone(), Some(&mut rng)).unwrap();
    let b = model.forward(x, Some(&mut rng)).unwrap();
    assert_ne!(a, b);
}
