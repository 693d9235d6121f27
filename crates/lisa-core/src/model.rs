use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

pub const COVERAGE_PARAM: &str = "TC_COVERED";
pub const NO_COVERAGE_ID: &str = "NO_ID";

/// Scalar cell value of an insertion record or a performance sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ColumnValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int(i) => Some(*i as f64),
            ColumnValue::Float(f) => Some(*f),
            ColumnValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer view; floats are truncated, text must be an integer literal.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int(i) => Some(*i),
            ColumnValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            ColumnValue::Float(_) => None,
            ColumnValue::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    /// Ordering used when sorting output records: numeric values (including
    /// numeric text) compare by value and sort before non-numeric text.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int(i) => write!(f, "{}", i),
            ColumnValue::Float(v) => write!(f, "{}", v),
            ColumnValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        ColumnValue::Text(s.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        ColumnValue::Text(s)
    }
}

impl From<i64> for ColumnValue {
    fn from(i: i64) -> Self {
        ColumnValue::Int(i)
    }
}

impl From<f64> for ColumnValue {
    fn from(f: f64) -> Self {
        ColumnValue::Float(f)
    }
}

/// One flat row for the persistence layer, column name -> value.
pub type Record = BTreeMap<String, ColumnValue>;

/// Metrics of a single performance measurement, metric name -> raw value.
pub type PerfSample = BTreeMap<String, ColumnValue>;

/// Declared properties of a test case in the suite definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testparams: Option<Vec<(String, String)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub covered_cases: String,
    /// VM name -> observed result.
    pub results: BTreeMap<String, String>,
    /// Empty for functional runs.
    pub perf: PerfSample,
    /// 1-based position of `perf` in the tool's sample stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<usize>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, properties: &TestProperties) -> Self {
        let name = name.into();
        let covered_cases = covered_cases(&name, properties);
        Self {
            name,
            covered_cases,
            results: BTreeMap::new(),
            perf: PerfSample::new(),
            sample: None,
        }
    }

    /// Records `(vm_name, result)`; a later result for the same VM wins.
    pub fn update_results(&mut self, vm_result: (&str, &str)) {
        let (vm_name, result) = vm_result;
        self.results.insert(vm_name.to_string(), result.to_string());
    }
}

fn covered_cases(name: &str, properties: &TestProperties) -> String {
    let found = properties.testparams.as_ref().and_then(|params| {
        params
            .iter()
            .find(|(key, _)| key == COVERAGE_PARAM)
            .map(|(_, value)| value.clone())
    });

    match found {
        Some(id) => id,
        None => {
            tracing::warn!(
                event = "coverage_missing",
                test = %name,
                "No test case ID found for {}",
                name
            );
            NO_COVERAGE_ID.to_string()
        }
    }
}
