//! Label sets and the label builder.
//!
//! The builder turns static instance identity into the base label set every
//! metric carries. Runtime-scoped metrics additionally carry `runtime_tag`.

use std::collections::BTreeMap;

use crate::snapshot::InstanceInfo;

pub const RUNTIME_TAG: &str = "runtime_tag";

/// Ordered name -> value mapping attached to a series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    /// Returns a copy of this set with one more label.
    pub fn with(&self, name: impl Into<String>, value: impl ToString) -> Self {
        let mut copy = self.clone();
        copy.set(name, value);
        copy
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Derives label sets from instance identity.
#[derive(Debug, Clone)]
pub struct LabelBuilder {
    base: LabelSet,
}

impl LabelBuilder {
    pub fn from_instance(info: &InstanceInfo) -> Self {
        let mut base = LabelSet::new();
        base.set("instance_name", &info.instance_name);
        base.set("instance_id", &info.instance_id);
        base.set("instance_type", &info.instance_type);
        base.set("availability_zone", &info.instance_availability_zone);
        base.set("region", &info.instance_region);
        base.set("subnet_id", &info.subnet_id);
        Self { base }
    }

    /// Labels for system-scope metrics.
    pub fn base(&self) -> LabelSet {
        self.base.clone()
    }

    /// Labels for metrics scoped to one runtime process.
    pub fn runtime(&self, tag: &str) -> LabelSet {
        self.base.with(RUNTIME_TAG, tag)
    }
}
