pub mod command;
pub mod ingest;
pub mod latest;
pub mod response;
pub mod sse;
