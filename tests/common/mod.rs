//! Helpers shared by the integration tests.

#![allow(dead_code)]

/// Finds the value of the first exposed series named `name` whose labels
/// include every pair in `labels`.
pub fn sample(text: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
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

/// All exposed series lines named `name`, labels included.
pub fn series(text: &str, name: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .map(str::to_string)
        .collect()
}

pub const INSTANCE: &str = r#""instance_info": {
    "instance_name": "trn1-node",
    "instance_id": "i-0a1b2c3d",
    "instance_type": "trn1.32xlarge",
    "instance_availability_zone": "us-west-2d",
    "instance_region": "us-west-2",
    "subnet_id": "subnet-06a7754948e8a000f"
}"#;

/// A runtime report for tag "367" with 32 cores, all idle except `busy`.
pub fn utilization_snapshot(busy: u32, utilization: f64) -> String {
    let cores: Vec<String> = (0..32)
        .map(|core| {
            let value = if core == busy { utilization } else { 0.0 };
            format!(r#""{core}": {{"neuroncore_utilization": {value}}}"#)
        })
        .collect();
    format!(
        r#"{{"neuron_runtime_data": [{{
            "neuron_runtime_tag": "367",
            "error": "",
            "report": {{"neuroncore_counters": {{"neuroncores_in_use": {{{}}}, "error": ""}}}}
        }}], {INSTANCE}}}"#,
        cores.join(",")
    )
}
