pub mod classifier;
pub mod config;
pub mod decision;
pub mod distance;
pub mod label_map;
pub mod motion;
pub mod pipeline;
pub mod sample_csv;
pub mod sink;
pub mod template_reader;
pub mod templates;
pub mod types;
pub mod window_accumulator;
pub mod worker;
