// Y.Doc wrapper using yrs (y-crdt Rust bindings).

use anyhow::{Context, Result};
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{
    Doc, GetString, MapRef, ReadTxn, StateVector, Text, TextRef, Transact, Update,
    XmlFragmentRef,
};

/// A document materialized from collab or snapshot bytes.
pub struct YDoc {
    doc: Doc,
}

impl YDoc {
    pub fn new() -> Self {
        Self { doc: Doc::new() }
    }

    /// Create a document with a specific client ID (for deterministic testing).
    pub fn with_client_id(client_id: u64) -> Self {
        let options = yrs::Options { client_id, ..Default::default() };
        Self { doc: Doc::with_options(options) }
    }

    /// Load a document from a v1 update. Empty input yields an empty document,
    /// which is what the collab server returns for a doc nobody has opened.
    pub fn from_state(data: &[u8]) -> Result<Self> {
        let ydoc = Self::new();
        if !data.is_empty() {
            ydoc.apply_update(data)?;
        }
        Ok(ydoc)
    }

    pub fn apply_update(&self, data: &[u8]) -> Result<()> {
        let update = Update::decode_v1(data).context("failed to decode Yjs update")?;
        self.doc.transact_mut().apply_update(update).context("failed to apply Yjs update")?;
        Ok(())
    }

    /// Encode the full document state as a v1 update.
    pub fn encode_state(&self) -> Vec<u8> {
        self.doc.transact().encode_state_as_update_v1(&StateVector::default())
    }

    pub fn state_vector(&self) -> StateVector {
        self.doc.transact().state_vector()
    }

    pub fn encode_state_vector(&self) -> Vec<u8> {
        self.state_vector().encode_v1()
    }

    /// Everything this document has that `since` does not.
    pub fn encode_diff(&self, since: &StateVector) -> Vec<u8> {
        self.doc.transact().encode_diff_v1(since)
    }

    pub fn get_or_insert_text(&self, name: &str) -> TextRef {
        self.doc.get_or_insert_text(name)
    }

    pub fn get_or_insert_map(&self, name: &str) -> MapRef {
        self.doc.get_or_insert_map(name)
    }

    pub fn get_or_insert_xml_fragment(&self, name: &str) -> XmlFragmentRef {
        self.doc.get_or_insert_xml_fragment(name)
    }

    pub fn get_text_string(&self, name: &str) -> String {
        let text = self.doc.get_or_insert_text(name);
        text.get_string(&self.doc.transact())
    }

    pub fn insert_text(&self, name: &str, index: u32, content: &str) {
        let text = self.doc.get_or_insert_text(name);
        let mut txn = self.doc.transact_mut();
        text.insert(&mut txn, index, content);
    }

    pub fn inner(&self) -> &Doc {
        &self.doc
    }
}

impl Default for YDoc {
    fn default() -> Self {
        Self::new()
    }
}
