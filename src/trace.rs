mod formatter;

pub use formatter::TimelineFormatter;
