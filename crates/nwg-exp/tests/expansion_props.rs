use std::collections::BTreeSet;

use nwg_core::params::{ParamValue, ParameterSpec, Scalar, MODE_KEY, SINGLE_TRIAL};
use nwg_exp::{expand, expanded_len, parse_config};
use proptest::prelude::*;

fn spec_with_axes(lengths: &[usize]) -> ParameterSpec {
    let mut spec = ParameterSpec::new("grid").with("word", Scalar::Str("fep".into()));
    for (axis, len) in lengths.iter().enumerate() {
        let values = (0..*len as i64).map(Scalar::Int).collect();
        spec = spec.with(format!("axis-{axis}"), ParamValue::List(values));
    }
    spec
}

#[test]
fn two_by_three_grid_yields_six_distinct_conditions() {
    let spec = spec_with_axes(&[2, 3]);
    let conditions = expand(&[spec]);
    assert_eq!(conditions.len(), 6);
    let combos: BTreeSet<(i64, i64)> = conditions
        .iter()
        .map(|c| (c.i64("axis-0").unwrap(), c.i64("axis-1").unwrap()))
        .collect();
    assert_eq!(combos.len(), 6);
    for condition in &conditions {
        assert!(condition.options.values().all(|value| !value.is_iterable()));
    }
}

#[test]
fn config_blocks_expand_in_section_order() {
    let text = "\
[DEFAULT]
word = 'fep'
test-delay = 0

[first]
decay-sup = [0.1, 0.2]

[second]
experiment = single
decay-sup = [0.1, 0.2, 0.3]
";
    let specs = parse_config(text).expect("parse");
    let conditions = expand(&specs);
    assert_eq!(conditions.len(), 3);
    assert_eq!(conditions[0].name, "first");
    assert_eq!(conditions[1].f64("decay-sup").unwrap(), 0.2);
    assert_eq!(conditions[2].name, "second");
    assert_eq!(
        conditions[2].get(MODE_KEY),
        Some(&ParamValue::Scalar(Scalar::Str(SINGLE_TRIAL.into())))
    );
}

proptest! {
    #[test]
    fn cardinality_is_product_of_axis_lengths(lengths in proptest::collection::vec(0usize..4, 0..4)) {
        let spec = spec_with_axes(&lengths);
        let expected: usize = if lengths.is_empty() { 1 } else { lengths.iter().product() };
        let conditions = expand(&[spec.clone()]);
        prop_assert_eq!(conditions.len(), expected);
        prop_assert_eq!(expanded_len(&spec), expected);

        let distinct: BTreeSet<Vec<i64>> = conditions
            .iter()
            .map(|c| (0..lengths.len()).map(|axis| c.i64(&format!("axis-{axis}")).unwrap()).collect())
            .collect();
        prop_assert_eq!(distinct.len(), expected);
    }

    #[test]
    fn expansion_is_deterministic(lengths in proptest::collection::vec(1usize..4, 1..4)) {
        let specs = vec![spec_with_axes(&lengths), spec_with_axes(&[2])];
        prop_assert_eq!(expand(&specs), expand(&specs));
    }

    #[test]
    fn single_trial_is_never_expanded(lengths in proptest::collection::vec(0usize..4, 0..4)) {
        let spec = spec_with_axes(&lengths).with(MODE_KEY, Scalar::Str(SINGLE_TRIAL.into()));
        let conditions = expand(&[spec.clone()]);
        prop_assert_eq!(conditions.len(), 1);
        prop_assert_eq!(&conditions[0].options, &spec.options);
    }
}
