mod command_source;
mod influx_writer;
mod occtl_parser;

pub use command_source::CommandSource;
pub use influx_writer::{
    DryRunSink, InfluxSettings, InfluxWriter, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_MS,
};
pub use occtl_parser::{OcctlParser, MEASUREMENT, NO_SESSION_USERNAME};
