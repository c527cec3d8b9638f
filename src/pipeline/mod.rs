pub mod ingest;
pub mod storage;
pub mod rag;
pub mod processor;
