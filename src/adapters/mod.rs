// Concrete collaborators behind the domain ports.

pub mod database;
pub mod http;
pub mod sink;
pub mod station_catalog;
pub mod worker_pool;

pub use database::DescribedDatabase;
pub use http::{HttpEventClient, HttpTravelTimeClient};
pub use sink::{ChannelSink, Frame};
pub use station_catalog::CsvStationCatalog;
pub use worker_pool::{BlockingExtract, BlockingExtractor};
