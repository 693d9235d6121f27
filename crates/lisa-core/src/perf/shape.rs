//! Per-family column shaping of performance records.
//!
//! Every shaper requires all of its metrics to be present in the test
//! case's sample; a missing or non-numeric metric fails the whole run.

use crate::errors::PipelineError;
use crate::model::{ColumnValue, Record, TestCase};
use std::cmp::Ordering;

/// (output column, metric key) pairs coerced to floating point.
const FIO_FLOAT_COLUMNS: &[(&str, &str)] = &[
    ("rand_read_iops", "rand-read:"),
    ("rand_read_lat_usec", "rand-read: latency"),
    ("rand_write_iops", "rand-write:"),
    ("rand_write_lat_usec", "rand-write: latency"),
    ("seq_read_iops", "seq-read:"),
    ("seq_read_lat_usec", "seq-read: latency"),
    ("seq_write_iops", "seq-write:"),
    ("seq_write_lat_usec", "seq-write: latency"),
];
const FIO_RAW_COLUMNS: &[(&str, &str)] = &[("QDepth", "QDepth"), ("BlockSize_KB", "BlockSize_KB")];

const TCP_FLOAT_COLUMNS: &[(&str, &str)] = &[
    ("Throughput_Gbps", "Throughput_Gbps"),
    ("Latency_ms", "AverageLatency_ms"),
    ("PacketSize_KBytes", "PacketSize_KBytes"),
    ("SenderCyclesPerByte", "SenderCyclesPerByte"),
    ("ReceiverCyclesPerByte", "ReceiverCyclesPerByte"),
];
const TCP_RAW_COLUMNS: &[(&str, &str)] =
    &[("IPVersion", "IPVersion"), ("ProtocolType", "Protocol")];

const UDP_FLOAT_COLUMNS: &[(&str, &str)] = &[
    ("TxThroughput_Gbps", "TxThroughput_Gbps"),
    ("RxThroughput_Gbps", "RxThroughput_Gbps"),
    ("DatagramLoss", "DatagramLoss"),
    ("PacketSize_KBytes", "PacketSize_KBytes"),
];
const UDP_RAW_COLUMNS: &[(&str, &str)] = &[
    ("IPVersion", "IPVersion"),
    ("ProtocolType", "Protocol"),
    ("SendBufSize_KBytes", "SendBufSize_KBytes"),
];

const LATENCY_FLOAT_COLUMNS: &[(&str, &str)] = &[
    ("MinLatency_us", "MinLatency_us"),
    ("AverageLatency_us", "AverageLatency_us"),
    ("MaxLatency_us", "MaxLatency_us"),
    ("Latency95Percentile_us", "Latency95Percentile_us"),
    ("Latency99Percentile_us", "Latency99Percentile_us"),
];
const LATENCY_RAW_COLUMNS: &[(&str, &str)] =
    &[("IPVersion", "IPVersion"), ("ProtocolType", "ProtocolType")];

const CONNECTIONS: (&str, &str) = ("NumberOfConnections", "NumberOfConnections");

pub fn shape_fio(record: &mut Record, test: &TestCase) -> Result<(), PipelineError> {
    copy_float(record, test, FIO_FLOAT_COLUMNS)?;
    copy_raw(record, test, FIO_RAW_COLUMNS)
}

pub fn shape_tcp(record: &mut Record, test: &TestCase) -> Result<(), PipelineError> {
    copy_int(record, test, CONNECTIONS)?;
    copy_float(record, test, TCP_FLOAT_COLUMNS)?;
    copy_raw(record, test, TCP_RAW_COLUMNS)
}

pub fn shape_udp(record: &mut Record, test: &TestCase) -> Result<(), PipelineError> {
    copy_int(record, test, CONNECTIONS)?;
    copy_float(record, test, UDP_FLOAT_COLUMNS)?;
    copy_raw(record, test, UDP_RAW_COLUMNS)
}

pub fn shape_latency(record: &mut Record, test: &TestCase) -> Result<(), PipelineError> {
    copy_raw(record, test, LATENCY_RAW_COLUMNS)?;
    copy_float(record, test, LATENCY_FLOAT_COLUMNS)
}

/// `"SRIOV"` when the test name mentions SR-IOV, `"Synthetic"` otherwise.
pub fn data_path(test_name: &str) -> &'static str {
    if test_name.to_lowercase().contains("sriov") {
        "SRIOV"
    } else {
        "Synthetic"
    }
}

/// Recovers the declared test name from a fanned-out one by keeping the
/// longest prefix that ends in a letter.
pub fn strip_sample_suffix(name: &str) -> String {
    match name.char_indices().rev().find(|(_, c)| c.is_alphabetic()) {
        Some((idx, c)) => name[..idx + c.len_utf8()].to_string(),
        None => name.to_string(),
    }
}

/// Stable ascending sort by the given columns, compared left to right.
pub fn sort_records(records: &mut [Record], keys: &[&str]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| match (a.get(*key), b.get(*key)) {
                (Some(x), Some(y)) => x.sort_cmp(y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn metric<'a>(test: &'a TestCase, key: &str) -> Result<&'a ColumnValue, PipelineError> {
    test.perf.get(key).ok_or_else(|| PipelineError::MissingMetric {
        test: test.name.clone(),
        key: key.to_string(),
    })
}

fn invalid(test: &TestCase, key: &str, value: &ColumnValue) -> PipelineError {
    PipelineError::InvalidMetric {
        test: test.name.clone(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn copy_raw(
    record: &mut Record,
    test: &TestCase,
    columns: &[(&str, &str)],
) -> Result<(), PipelineError> {
    for (column, key) in columns {
        let value = metric(test, key)?;
        record.insert(column.to_string(), value.clone());
    }
    Ok(())
}

fn copy_float(
    record: &mut Record,
    test: &TestCase,
    columns: &[(&str, &str)],
) -> Result<(), PipelineError> {
    for (column, key) in columns {
        let value = metric(test, key)?;
        let float = value.as_f64().ok_or_else(|| invalid(test, key, value))?;
        record.insert(column.to_string(), ColumnValue::Float(float));
    }
    Ok(())
}

fn copy_int(
    record: &mut Record,
    test: &TestCase,
    (column, key): (&str, &str),
) -> Result<(), PipelineError> {
    let value = metric(test, key)?;
    let int = value.as_i64().ok_or_else(|| invalid(test, key, value))?;
    record.insert(column.to_string(), ColumnValue::Int(int));
    Ok(())
}
