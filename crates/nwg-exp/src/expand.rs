use indexmap::IndexMap;
use nwg_core::params::{ExpandedCondition, ParamValue, ParameterSpec, Scalar};

/// Expands experiment blocks into concrete conditions.
///
/// Single-trial blocks and blocks without sweep axes are emitted unchanged.
/// Every other block yields the Cartesian product of its list-valued options,
/// enumerated with the first declared axis varying slowest; scalar options are
/// copied verbatim into each condition.
pub fn expand(specs: &[ParameterSpec]) -> Vec<ExpandedCondition> {
    let mut outputs = Vec::new();
    for spec in specs {
        if spec.is_single_trial() {
            outputs.push(ExpandedCondition::from_spec(spec.clone()));
            continue;
        }
        let axes: Vec<(&str, &[Scalar])> = spec
            .options
            .iter()
            .filter_map(|(key, value)| match value {
                ParamValue::List(values) => Some((key.as_str(), values.as_slice())),
                ParamValue::Scalar(_) => None,
            })
            .collect();
        if axes.is_empty() {
            outputs.push(ExpandedCondition::from_spec(spec.clone()));
            continue;
        }
        expand_grid(spec, &axes, 0, &mut Vec::with_capacity(axes.len()), &mut outputs);
    }
    outputs
}

/// Number of conditions [`expand`] produces for one block.
pub fn expanded_len(spec: &ParameterSpec) -> usize {
    if spec.is_single_trial() {
        return 1;
    }
    spec.options
        .values()
        .filter_map(|value| match value {
            ParamValue::List(values) => Some(values.len()),
            ParamValue::Scalar(_) => None,
        })
        .product()
}

fn expand_grid<'a>(
    spec: &ParameterSpec,
    axes: &[(&str, &'a [Scalar])],
    depth: usize,
    current: &mut Vec<&'a Scalar>,
    outputs: &mut Vec<ExpandedCondition>,
) {
    if depth == axes.len() {
        outputs.push(substitute(spec, axes, current));
        return;
    }
    for value in axes[depth].1 {
        current.push(value);
        expand_grid(spec, axes, depth + 1, current, outputs);
        current.pop();
    }
}

fn substitute(spec: &ParameterSpec, axes: &[(&str, &[Scalar])], picks: &[&Scalar]) -> ExpandedCondition {
    let mut options: IndexMap<String, ParamValue> = spec.options.clone();
    for ((name, _), value) in axes.iter().zip(picks) {
        options.insert((*name).to_string(), ParamValue::Scalar((*value).clone()));
    }
    ExpandedCondition {
        name: spec.name.clone(),
        options,
    }
}
