// SPDX-License-Identifier: Apache-2.0

pub mod store;

pub use store::{DatasetStore, MemoryDatasetStore};
