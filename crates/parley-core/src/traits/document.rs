// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document ingestion trait.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::DocumentRecord;

/// Turns uploaded bytes into a stored document record.
///
/// The bridge keeps only the returned `storage_path` and displays title and
/// summary; it never reparses the document.
#[async_trait]
pub trait DocumentIngestor: PluginAdapter {
    async fn ingest(&self, file_name: &str, bytes: &[u8]) -> Result<DocumentRecord, ParleyError>;
}
