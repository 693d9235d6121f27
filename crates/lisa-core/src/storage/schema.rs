use crate::config::TableConfig;

const FUNCTIONAL_COLUMNS: &str = r#"
  "TestResult" TEXT,
  "HostName" TEXT,
  "HostVersion" TEXT,
  "TestCaseName" TEXT NOT NULL,
  "TestArea" TEXT,
  "TestDate" TEXT,
  "GuestOS" TEXT,
  "KernelVersion" TEXT,
  "GuestDistro" TEXT"#;

const PERF_COMMON_COLUMNS: &str = r#"
  "TestCaseName" TEXT NOT NULL,
  "TestDate" TEXT,
  "HostBy" TEXT,
  "HostOS" TEXT,
  "HostType" TEXT,
  "GuestOS" TEXT,
  "GuestDistro" TEXT,
  "KernelVersion" TEXT,
  "GuestSize" TEXT"#;

const FIO_COLUMNS: &str = r#"
  "QDepth" INTEGER,
  "BlockSize_KB" INTEGER,
  "rand_read_iops" REAL,
  "rand_read_lat_usec" REAL,
  "rand_write_iops" REAL,
  "rand_write_lat_usec" REAL,
  "seq_read_iops" REAL,
  "seq_read_lat_usec" REAL,
  "seq_write_iops" REAL,
  "seq_write_lat_usec" REAL"#;

const TCP_COLUMNS: &str = r#"
  "DataPath" TEXT,
  "NumberOfConnections" INTEGER,
  "Throughput_Gbps" REAL,
  "Latency_ms" REAL,
  "PacketSize_KBytes" REAL,
  "SenderCyclesPerByte" REAL,
  "ReceiverCyclesPerByte" REAL,
  "IPVersion" TEXT,
  "ProtocolType" TEXT"#;

const UDP_COLUMNS: &str = r#"
  "DataPath" TEXT,
  "NumberOfConnections" INTEGER,
  "TxThroughput_Gbps" REAL,
  "RxThroughput_Gbps" REAL,
  "DatagramLoss" REAL,
  "PacketSize_KBytes" REAL,
  "IPVersion" TEXT,
  "ProtocolType" TEXT,
  "SendBufSize_KBytes" INTEGER"#;

const LATENCY_COLUMNS: &str = r#"
  "DataPath" TEXT,
  "IPVersion" TEXT,
  "ProtocolType" TEXT,
  "MinLatency_us" REAL,
  "AverageLatency_us" REAL,
  "MaxLatency_us" REAL,
  "Latency95Percentile_us" REAL,
  "Latency99Percentile_us" REAL"#;

/// DDL for the result tables under their configured names.
pub fn ddl(tables: &TableConfig) -> String {
    let mut sql = String::new();
    sql.push_str(&create_table(&tables.functional, &[FUNCTIONAL_COLUMNS]));
    sql.push_str(&create_table(&tables.fio, &[PERF_COMMON_COLUMNS, FIO_COLUMNS]));
    sql.push_str(&create_table(&tables.tcp, &[PERF_COMMON_COLUMNS, TCP_COLUMNS]));
    sql.push_str(&create_table(&tables.udp, &[PERF_COMMON_COLUMNS, UDP_COLUMNS]));
    sql.push_str(&create_table(&tables.latency, &[PERF_COMMON_COLUMNS, LATENCY_COLUMNS]));
    sql
}

fn create_table(name: &str, column_groups: &[&str]) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,{}\n);\n",
        quote_ident(name),
        column_groups.join(",")
    )
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
