//! Trade record output
//!
//! Every lifecycle transition is written as a [`TradeRecord`] for analysis

mod recorder;
mod records;

pub use recorder::FileTradeRecorder;
pub use records::TradeRecord;

use async_trait::async_trait;

/// Destination for trade records
#[async_trait]
pub trait TradeRecordSink: Send + Sync {
    async fn record(&self, record: &TradeRecord) -> anyhow::Result<()>;
}
