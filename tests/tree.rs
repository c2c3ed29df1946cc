use param_tree::{
    Layout, OwnedMatrix, ParamErr, ParameterValue, Parameters, ParametersCopy, Result, Vector,
    ValuesMut,
};
use rand::{SeedableRng, rngs::StdRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn model() -> Result<Parameters<'static>> {
    let mut model = Parameters::new("model");
    model.push(Vector::new("w1", vec![1f32, 2., 3.]))?;
    model.push(Vector::new("w2", vec![4f32, 5.]))?;
    Ok(model)
}

fn deep(depth: usize, rng: &mut StdRng) -> Result<Parameters<'static>> {
    let mut node = Parameters::new(format!("level{depth}"));
    node.push(OwnedMatrix::<f32>::zeros("w", (depth + 1, 2))?)?;
    node.push(Vector::new("b", vec![0f64; depth + 1]))?;
    if depth > 0 {
        node.push(deep(depth - 1, rng)?)?;
    }

    node.random_fill(1., rng);
    Ok(node)
}

fn flatten(node: &dyn ParameterValue<'_>) -> Result<Vec<f64>> {
    let mut out = vec![0f64; node.parameter_count()];
    node.copy_to(ValuesMut::from(&mut out))?;
    Ok(out)
}

#[test]
fn model_scenario() -> Result<()> {
    init_logger();

    let mut source = model()?;
    assert_eq!(source.parameter_count(), 5);

    let mut buf = vec![0f32; 5];
    let copy = source.compatible_copy(ValuesMut::from(&mut buf))?;
    assert!((copy.two_norm() - source.two_norm()).abs() < 1e-9);

    source.fill(0.);
    assert_eq!(flatten(copy.as_ref())?, [1., 2., 3., 4., 5.]);
    assert_eq!(source.two_norm(), 0.);

    drop(copy);
    assert_eq!(buf, [1., 2., 3., 4., 5.]);
    Ok(())
}

#[test]
fn reference_views_round_trip() -> Result<()> {
    init_logger();

    let mut rng = StdRng::seed_from_u64(1);
    let tree = deep(3, &mut rng)?;
    let expected = flatten(&tree)?;

    let mut buf = vec![0f64; tree.parameter_count()];
    tree.copy_to(ValuesMut::from(&mut buf))?;

    let view = tree.compatible_ref(ValuesMut::from(&mut buf))?;
    assert_eq!(view.layout(), tree.layout());
    assert_eq!(flatten(view.as_ref())?, expected);
    Ok(())
}

#[test]
fn copies_do_not_alias_the_source() -> Result<()> {
    init_logger();

    let mut rng = StdRng::seed_from_u64(2);
    let mut tree = deep(2, &mut rng)?;
    let before = flatten(&tree)?;

    let mut buf = vec![0f64; tree.parameter_count()];
    let copy = tree.compatible_copy(ValuesMut::from(&mut buf))?;
    let owned = ParametersCopy::<f64>::new(&tree)?;

    tree.random_fill(1., &mut rng);
    tree.scale(3.);

    assert_eq!(flatten(copy.as_ref())?, before);
    assert_eq!(owned.to_vec()?, before);
    Ok(())
}

#[test]
fn parameter_count_sums_recursively() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let tree = deep(4, &mut rng)?;

    fn check(node: &Parameters<'_>) -> usize {
        let sum = node
            .iter()
            .map(|child| match child.parameters() {
                Ok(params) => check(params),
                Err(_) => child.parameter_count(),
            })
            .sum::<usize>();

        assert_eq!(node.parameter_count(), sum);
        sum
    }

    // every level holds (d + 1) * 2 + (d + 1) values
    assert_eq!(check(&tree), (1..=5).map(|n| n * 3).sum::<usize>());
    Ok(())
}

#[test]
fn failed_add_changes_nothing() -> Result<()> {
    init_logger();

    let mut tree = model()?;
    let err = tree
        .push(Vector::new("w2", vec![0f32; 10]))
        .map(|_| ())
        .unwrap_err();

    assert!(matches!(err, ParamErr::DuplicateName { ref name } if name == "w2"));
    assert_eq!(tree.parameter_count(), 5);
    assert_eq!(tree.names().collect::<Vec<_>>(), ["w1", "w2"]);
    Ok(())
}

#[test]
fn norms_combine_across_children() -> Result<()> {
    let mut single = Parameters::new("single");
    single.push(Vector::new("a", vec![3f64, 4.]))?;
    assert_eq!(single.two_norm(), 5.);

    single.push(Vector::new("b", vec![0f64]))?;
    assert_eq!(single.two_norm(), 5.);

    assert_eq!(Parameters::new("empty").two_norm(), 0.);
    Ok(())
}

#[test]
fn reference_buffers_must_match_exactly() -> Result<()> {
    let tree = model()?;
    let mut short = vec![0f32; 4];
    let mut long = vec![0f32; 6];

    assert!(matches!(
        tree.compatible_ref(ValuesMut::from(&mut short)),
        Err(ParamErr::SizeMismatch { .. })
    ));
    assert!(matches!(
        tree.compatible_ref(ValuesMut::from(&mut long)),
        Err(ParamErr::SizeMismatch { .. })
    ));
    assert!(matches!(
        tree.compatible_copy(ValuesMut::from(&mut long)),
        Err(ParamErr::SizeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn accessors_report_the_wrong_kind() -> Result<()> {
    let tree = model()?;
    assert!(matches!(tree.vector(), Err(ParamErr::WrongKind { .. })));

    let leaf = tree.child(0)?;
    assert!(matches!(leaf.parameters(), Err(ParamErr::WrongKind { .. })));
    assert!(leaf.vector().is_ok());
    Ok(())
}

#[test]
fn views_partition_a_shared_buffer() -> Result<()> {
    init_logger();

    let layout = model()?.layout();
    let mut buf = vec![0f64; layout.parameter_count()];

    {
        let mut view = model()?.reference(&mut buf)?;
        view.child_mut(0)?.fill(1.);
        view.child_mut(1)?.vector_mut()?.set(1, 9.)?;
    }

    for (path, range) in layout.offsets() {
        match path.as_str() {
            "model/w1" => assert!(buf[range].iter().all(|&v| v == 1.)),
            "model/w2" => assert_eq!(buf[range], [0., 9.]),
            other => panic!("unexpected leaf {other}"),
        }
    }

    Ok(())
}

#[test]
fn gradient_step_through_a_flat_buffer() -> Result<()> {
    init_logger();

    let mut weights = model()?;
    let mut grads = vec![0f32; weights.parameter_count()];

    {
        let mut view = weights.reference(&mut grads)?;
        view.fill(1.);
        view.scale(2.);
    }

    let grad_tree = Layout::build_tree(&weights.layout(), ValuesMut::from(&mut grads))?;
    weights.update(&grad_tree, 0.5)?;

    assert_eq!(flatten(&weights)?, [0., 1., 2., 3., 4.]);
    Ok(())
}

#[test]
fn owned_copies_nest_inside_trees() -> Result<()> {
    init_logger();

    let mut rng = StdRng::seed_from_u64(4);
    let inner = deep(1, &mut rng)?;

    let mut outer = Parameters::new("outer");
    outer.push(ParametersCopy::<f32>::new(&inner)?)?;
    outer.push(Vector::new("bias", vec![1f64, 2.]))?;

    assert_eq!(outer.subparams(0, "level1")?.parameter_count(), inner.parameter_count());
    assert_eq!(outer.subparams(0, "level1")?.subparams(2, "level0")?.parameter_count(), 3);

    let mut delta = Parameters::new("outer");
    delta.push(ParametersCopy::<f64>::new(&inner)?)?;
    delta.push(Vector::new("bias", vec![0f64, 0.]))?;
    outer.sub_assign(&delta)?;

    assert!(flatten(&outer)?[..inner.parameter_count()].iter().all(|v| v.abs() < 1e-6));
    assert_eq!(outer.layout().parameter_count(), inner.parameter_count() + 2);
    Ok(())
}

#[test]
fn nested_mismatch_leaves_earlier_children_applied() -> Result<()> {
    init_logger();

    let mut tree = Parameters::new("root");
    tree.push(Vector::new("a", vec![1f64, 1.]))?;
    tree.push(model()?)?;

    let mut other = Parameters::new("root");
    other.push(Vector::new("a", vec![2f64, 3.]))?;
    let mut renamed = Parameters::new("model");
    renamed.push(Vector::new("w1", vec![0f32; 3]))?;
    renamed.push(Vector::new("w3", vec![0f32; 2]))?;
    other.push(renamed)?;

    let err = tree.add_assign(&other).unwrap_err();
    assert!(matches!(err, ParamErr::ShapeMismatch { ref name, .. } if name == "w2"));

    assert_eq!(flatten(tree.child(0)?)?, [3., 4.]);
    assert_eq!(flatten(tree.child(1)?)?, [1., 2., 3., 4., 5.]);
    Ok(())
}
