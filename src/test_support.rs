//! Helpers shared by unit tests.

use crate::snapshot::InstanceInfo;

/// Finds the value of the first exposed series named `name` whose labels
/// include every pair in `labels`.
pub(crate) fn sample(text: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (series, value) = line.rsplit_once(' ')?;
            let (metric, pairs) = match series.split_once('{') {
                Some((metric, rest)) => (metric, rest.trim_end_matches('}')),
                None => (series, ""),
            };
            if metric != name {
                return None;
            }
            let found: Vec<(&str, &str)> = pairs
                .split("\",")
                .filter(|pair| !pair.is_empty())
                .filter_map(|pair| {
                    let (key, value) = pair.split_once("=\"")?;
                    Some((key, value.trim_end_matches('"')))
                })
                .collect();
            if labels.iter().all(|wanted| found.contains(wanted)) {
                value.parse().ok()
            } else {
                None
            }
        })
}

/// Number of exposed series named `name`.
pub(crate) fn series_count(text: &str, name: &str) -> usize {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .count()
}

pub(crate) fn instance() -> InstanceInfo {
    InstanceInfo {
        instance_name: "trn1-node".into(),
        instance_id: "i-0a1b2c3d".into(),
        instance_type: "trn1.32xlarge".into(),
        instance_availability_zone: "us-west-2d".into(),
        instance_region: "us-west-2".into(),
        subnet_id: "subnet-06a7754948e8a000f".into(),
    }
}
