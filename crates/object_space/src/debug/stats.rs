//! Statistics output sinks

use log::{info, warn};

/// Line-oriented text output for statistics (an on-screen stats font)
pub trait StatsFont {
    /// Write one line
    fn out_line(&mut self, line: &str);
}

/// Receiver for performance warnings
pub trait PerformanceAlert {
    /// Report one warning
    fn raise(&mut self, message: &str);
}

/// Collects statistics lines in memory
#[derive(Debug, Default, Clone)]
pub struct StatsLines {
    /// Lines written so far
    pub lines: Vec<String>,
}

impl StatsFont for StatsLines {
    fn out_line(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }
}

/// Collects alerts in memory
#[derive(Debug, Default, Clone)]
pub struct AlertLog {
    /// Alerts raised so far
    pub alerts: Vec<String>,
}

impl PerformanceAlert for AlertLog {
    fn raise(&mut self, message: &str) {
        self.alerts.push(message.to_owned());
    }
}

/// Writes statistics to the log instead of the screen
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatsFont for LogSink {
    fn out_line(&mut self, line: &str) {
        info!("{line}");
    }
}

impl PerformanceAlert for LogSink {
    fn raise(&mut self, message: &str) {
        warn!("Performance alert: {message}");
    }
}
