//! Integration tests for the threadstore comment storage system

mod cli_parse;
mod graph_properties;
mod store_reads;
mod store_writes;
mod support;
