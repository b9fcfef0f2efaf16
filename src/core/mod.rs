pub mod etl;
pub mod extract;
pub mod load;
pub mod query;
pub mod transform;

pub use crate::domain::model::{EnrichedRecord, ExchangeRateTable, QueryResult, Record, Table};
pub use crate::domain::ports::{ConfigProvider, DocumentSource};
pub use crate::utils::error::Result;
