mod ingest_client;
mod link_opener;
mod reporter;
mod results_provider;

pub use ingest_client::IngestClient;
pub use link_opener::LinkOpener;
pub use reporter::Reporter;
pub use results_provider::{AggregatorListener, ResultsProvider};
