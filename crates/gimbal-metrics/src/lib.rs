//! Metrics infrastructure for the gimbal serial link.
//!
//! This crate describes all metrics emitted by the link and provides label
//! helpers. It re-exports the `metrics` crate so callers record through the
//! same facade version. Without an installed recorder every call is a no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! use gimbal_metrics::{metric_defs, LinkLabels};
//!
//! let labels = LinkLabels::new("/dev/ttyUSB0");
//! metrics::counter!(metric_defs::LINK_BYTES_READ.name, &labels.to_labels()).increment(6);
//! ```

pub use metrics;

use metrics::{describe_counter, Unit};

/// A counter declaration with its metadata.
///
/// Every link metric is a monotonically increasing counter labelled by
/// device.
///
/// ```rust
/// use gimbal_metrics::Metric;
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("gimbal.link.frames")
///     .with_description("Frames received")
///     .with_unit(Unit::Count)
///     .with_labels(&["device"]);
///
/// assert_eq!(FRAMES.name, "gimbal.link.frames");
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match self.unit {
            Some(unit) => {
                describe_counter!(self.name, unit, self.description);
            }
            None => {
                describe_counter!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the serial link.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Successful opens.
    pub const LINK_OPENS: Metric = Metric::counter("gimbal.link.opens")
        .with_description("Successful link opens")
        .with_unit(Unit::Count)
        .with_labels(&["device"]);

    /// Failed opens.
    ///
    /// Labels: device, reason
    pub const LINK_OPEN_FAILURES: Metric = Metric::counter("gimbal.link.open_failures")
        .with_description("Failed link opens by reason")
        .with_unit(Unit::Count)
        .with_labels(&["device", "reason"]);

    /// Bytes taken from the channel by reads.
    pub const LINK_BYTES_READ: Metric = Metric::counter("gimbal.link.bytes_read")
        .with_description("Bytes received from the controller")
        .with_unit(Unit::Bytes)
        .with_labels(&["device"]);

    /// Bytes handed to the channel by writes.
    pub const LINK_BYTES_WRITTEN: Metric = Metric::counter("gimbal.link.bytes_written")
        .with_description("Bytes sent to the controller")
        .with_unit(Unit::Bytes)
        .with_labels(&["device"]);

    /// Reads that found nothing within the timeout.
    pub const LINK_READ_NO_DATA: Metric = Metric::counter("gimbal.link.read_no_data")
        .with_description("Reads that expired without data")
        .with_unit(Unit::Count)
        .with_labels(&["device"]);

    /// Read, write, drain or close calls that failed.
    ///
    /// Labels: device, op
    pub const LINK_IO_ERRORS: Metric = Metric::counter("gimbal.link.io_errors")
        .with_description("Channel I/O failures by operation")
        .with_unit(Unit::Count)
        .with_labels(&["device", "op"]);

    /// Frame validation outcomes.
    ///
    /// Labels: device, result
    pub const FRAME_VALIDATIONS: Metric = Metric::counter("gimbal.frame.validations")
        .with_description("Received frames by validation result")
        .with_unit(Unit::Count)
        .with_labels(&["device", "result"]);

    /// Every metric declared above.
    pub const ALL: &[Metric] = &[
        LINK_OPENS,
        LINK_OPEN_FAILURES,
        LINK_BYTES_READ,
        LINK_BYTES_WRITTEN,
        LINK_READ_NO_DATA,
        LINK_IO_ERRORS,
        FRAME_VALIDATIONS,
    ];
}

/// Standard labels for link-scoped metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLabels {
    /// Device path of the link.
    pub device: String,
}

impl LinkLabels {
    /// Creates labels for the given device.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    /// Returns the labels as key-value pairs for the metrics macros.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("device", self.device.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all link metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
