// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::Mutex;

use crate::{ErrorSink, HostError, Operation};

/// An [`ErrorSink`] that remembers every report it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(Operation, HostError)>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every report received so far, oldest first.
    #[must_use]
    pub fn reports(&self) -> Vec<(Operation, HostError)> {
        self.reports.lock().clone()
    }

    /// The operations of every report received so far, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.reports.lock().iter().map(|(operation, _)| *operation).collect()
    }

    /// Returns `true` if nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, operation: Operation, error: &HostError) {
        self.reports.lock().push((operation, error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let sink = RecordingSink::new();
        assert!(sink.is_empty());

        sink.report(Operation::Seek, &HostError::io_error("first"));
        sink.report(Operation::Tell, &HostError::missing_method("tell"));

        assert_eq!(sink.operations(), [Operation::Seek, Operation::Tell]);
        assert_eq!(sink.reports()[0].1.message(), "first");
        assert!(!sink.is_empty());
    }
}
