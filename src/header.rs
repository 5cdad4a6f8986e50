use serde::{Deserialize, Serialize};

use crate::codec::RecordFormat;
use crate::config::KnnConfig;

/// Describes how a saved result set was produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultHeader {
    pub version: u32,
    pub format: RecordFormat,
    pub config: KnnConfig,
    pub dataset_rows: usize,
    pub query_rows: usize,
    /// Dataset row ids used as queries, when queries were sampled from it.
    pub query_ids: Option<Vec<usize>>,
    pub cpu_features: String,
    pub crate_version: String,
}

impl ResultHeader {
    pub fn new(
        config: KnnConfig,
        format: RecordFormat,
        dataset_rows: usize,
        query_rows: usize,
        query_ids: Option<Vec<usize>>,
    ) -> Self {
        let cpu = format!("sse2:{} avx2:{} avx512f:{}",
                          cfg!(target_feature = "sse2"),
                          cfg!(target_feature = "avx2"),
                          cfg!(target_feature = "avx512f"));
        Self {
            version: 1,
            format,
            config,
            dataset_rows,
            query_rows,
            query_ids,
            cpu_features: cpu,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
