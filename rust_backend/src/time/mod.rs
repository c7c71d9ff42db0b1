pub mod timestamps;

pub use timestamps::{format_timestamp, parse_time_window, parse_timestamp};
