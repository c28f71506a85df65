// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for code that consumes streams.
//!
//! This module is available with the `test-util` feature.

mod fake_file;
mod recording_sink;

pub use fake_file::{FakeFile, FakeFileBuilder};
pub use recording_sink::RecordingSink;
