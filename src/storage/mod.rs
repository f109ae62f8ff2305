// Historical price table

pub mod csv_store;

pub use csv_store::HistoricalStore;
