mod line_writer;
mod metrics_parser;
mod snapshot_source;

pub use line_writer::LineWriter;
pub use metrics_parser::MetricsParser;
pub use snapshot_source::SnapshotSource;
