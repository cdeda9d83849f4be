// Restoring a snapshot into live collab state.
//
// The snapshot is decoded into a scratch document, the target shared type
// is read out of it and spliced into the live document in one transaction
// (clear, then re-insert). The caller receives only the incremental update
// so concurrent collaborators merge it like any other edit.

use anyhow::Result;
use tracing::debug;
use yrs::types::text::YChange;
use yrs::{Any, Out, Text, Transact};

use super::editor_sync::{extract_text, write_blocks};
use super::YDoc;

/// Restore the Y.Text `text_key`, keeping inline formatting. Returns the
/// update to broadcast.
pub fn restore_text(live: &YDoc, snapshot: &[u8], text_key: &str) -> Result<Vec<u8>> {
    let snapshot = YDoc::from_state(snapshot)?;
    let source = snapshot.get_or_insert_text(text_key);
    let delta = source.diff(&snapshot.inner().transact(), YChange::identity);

    let target = live.get_or_insert_text(text_key);
    let before = live.state_vector();
    {
        let mut txn = live.inner().transact_mut();
        let len = target.len(&txn);
        if len > 0 {
            target.remove_range(&mut txn, 0, len);
        }
        for chunk in delta {
            let Out::Any(Any::String(content)) = chunk.insert else {
                debug!(text_key, "skipping embedded value during restore");
                continue;
            };
            // Plain chunks still go through the attributed insert so they do
            // not inherit formatting from the chunk before them.
            let attributes = chunk.attributes.map(|attributes| *attributes).unwrap_or_default();
            let index = target.len(&txn);
            target.insert_with_attributes(&mut txn, index, &content, attributes);
        }
    }
    Ok(live.encode_diff(&before))
}

/// Restore the block-editor fragment `fragment_key` from the snapshot's
/// plain text, rebuilt as paragraph blocks. Returns the update to broadcast.
pub fn restore_rich(live: &YDoc, snapshot: &[u8], fragment_key: &str) -> Result<Vec<u8>> {
    let snapshot = YDoc::from_state(snapshot)?;
    let text = extract_text(&snapshot, fragment_key);

    let before = live.state_vector();
    write_blocks(live, fragment_key, &text);
    Ok(live.encode_diff(&before))
}
