// Moving content between the block editor (an XmlFragment of
// blockgroup/blockcontainer/paragraph elements) and the code editor (a
// plain Y.Text). Only text survives the trip; block formatting is not
// carried into the code editor.

use dontpad_common::id::EditorKeys;
use rand::Rng;
use yrs::{
    GetString, ReadTxn, Text, Transact, TransactionMut, Xml, XmlElementPrelim, XmlFragment,
    XmlFragmentRef, XmlOut, XmlTextPrelim,
};

use super::YDoc;

const BLOCK_GROUP: &str = "blockgroup";
const BLOCK_CONTAINER: &str = "blockcontainer";
const PARAGRAPH: &str = "paragraph";
const BLOCK_ID_LEN: usize = 22;
const BLOCK_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Plain text of a block-editor fragment, one line per block.
///
/// Block groups are unwrapped so each block container becomes its own
/// line, nested child blocks included. Other top-level nodes contribute
/// their flattened text when it is non-empty.
pub fn extract_text(doc: &YDoc, fragment_key: &str) -> String {
    let fragment = doc.get_or_insert_xml_fragment(fragment_key);
    let txn = doc.inner().transact();
    fragment_lines(&fragment, &txn).join("\n")
}

/// Replace the fragment's content with one paragraph block per line of
/// `text`. Empty text still produces a single empty paragraph.
pub fn write_blocks(doc: &YDoc, fragment_key: &str, text: &str) {
    let fragment = doc.get_or_insert_xml_fragment(fragment_key);
    let mut txn = doc.inner().transact_mut();
    replace_blocks(&fragment, &mut txn, text);
}

/// Block editor -> code editor.
pub fn sync_rich_to_code(doc: &YDoc, keys: &EditorKeys) {
    let text = extract_text(doc, &keys.rich);
    let code = doc.get_or_insert_text(&keys.code);
    let mut txn = doc.inner().transact_mut();
    let len = code.len(&txn);
    if len > 0 {
        code.remove_range(&mut txn, 0, len);
    }
    code.insert(&mut txn, 0, &text);
}

/// Code editor -> block editor.
pub fn sync_code_to_rich(doc: &YDoc, keys: &EditorKeys) {
    let text = doc.get_text_string(&keys.code);
    write_blocks(doc, &keys.rich, &text);
}

pub(crate) fn replace_blocks(fragment: &XmlFragmentRef, txn: &mut TransactionMut, text: &str) {
    let existing = fragment.len(&*txn);
    if existing > 0 {
        fragment.remove_range(txn, 0, existing);
    }

    let group = fragment.insert(txn, 0, XmlElementPrelim::empty(BLOCK_GROUP));
    for line in text.split('\n') {
        let container = group.push_back(txn, XmlElementPrelim::empty(BLOCK_CONTAINER));
        container.insert_attribute(txn, "id", block_id().as_str());

        let paragraph = container.push_back(txn, XmlElementPrelim::empty(PARAGRAPH));
        paragraph.insert_attribute(txn, "backgroundColor", "default");
        paragraph.insert_attribute(txn, "textAlignment", "left");
        paragraph.insert_attribute(txn, "textColor", "default");
        paragraph.push_back(txn, XmlTextPrelim::new(line));
    }
}

fn fragment_lines<T: ReadTxn>(fragment: &XmlFragmentRef, txn: &T) -> Vec<String> {
    let mut lines = Vec::new();
    for index in 0..fragment.len(txn) {
        match fragment.get(txn, index) {
            Some(XmlOut::Element(element)) if element.tag().to_string() == BLOCK_GROUP => {
                group_lines(&element, txn, &mut lines);
            }
            Some(node) => {
                let text = flatten(&node, txn);
                if !text.is_empty() {
                    lines.push(text);
                }
            }
            None => {}
        }
    }
    lines
}

fn group_lines<F: XmlFragment, T: ReadTxn>(group: &F, txn: &T, lines: &mut Vec<String>) {
    for index in 0..group.len(txn) {
        let Some(XmlOut::Element(container)) = group.get(txn, index) else {
            continue;
        };
        let mut content = String::new();
        let mut nested = Vec::new();
        for child_index in 0..container.len(txn) {
            match container.get(txn, child_index) {
                Some(XmlOut::Element(child)) if child.tag().to_string() == BLOCK_GROUP => {
                    group_lines(&child, txn, &mut nested);
                }
                Some(child) => content.push_str(&flatten(&child, txn)),
                None => {}
            }
        }
        lines.push(content);
        lines.append(&mut nested);
    }
}

fn flatten<T: ReadTxn>(node: &XmlOut, txn: &T) -> String {
    match node {
        XmlOut::Text(text) => text.get_string(txn),
        XmlOut::Element(element) => {
            (0..element.len(txn)).filter_map(|i| element.get(txn, i)).map(|c| flatten(&c, txn)).collect()
        }
        XmlOut::Fragment(fragment) => (0..fragment.len(txn))
            .filter_map(|i| fragment.get(txn, i))
            .map(|c| flatten(&c, txn))
            .collect(),
    }
}

fn block_id() -> String {
    let mut rng = rand::thread_rng();
    (0..BLOCK_ID_LEN)
        .map(|_| char::from(BLOCK_ID_ALPHABET[rng.gen_range(0..BLOCK_ID_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dontpad_common::id::editor_keys;

    #[test]
    fn blocks_round_trip_lines() {
        let doc = YDoc::new();
        write_blocks(&doc, "blocknote", "primeira linha\n\nterceira linha");
        assert_eq!(extract_text(&doc, "blocknote"), "primeira linha\n\nterceira linha");
    }

    #[test]
    fn empty_text_writes_one_empty_paragraph() {
        let doc = YDoc::new();
        write_blocks(&doc, "blocknote", "");

        let fragment = doc.get_or_insert_xml_fragment("blocknote");
        let txn = doc.inner().transact();
        assert_eq!(fragment.len(&txn), 1);
        let Some(XmlOut::Element(group)) = fragment.get(&txn, 0) else {
            panic!("first child should be the block group");
        };
        assert_eq!(group.tag().to_string(), BLOCK_GROUP);
        assert_eq!(group.len(&txn), 1);
    }

    #[test]
    fn paragraphs_carry_default_attributes_and_block_ids() {
        let doc = YDoc::new();
        write_blocks(&doc, "blocknote", "a\nb");

        let fragment = doc.get_or_insert_xml_fragment("blocknote");
        let txn = doc.inner().transact();
        let Some(XmlOut::Element(group)) = fragment.get(&txn, 0) else {
            panic!("first child should be the block group");
        };
        assert_eq!(group.len(&txn), 2);
        let Some(XmlOut::Element(container)) = group.get(&txn, 0) else {
            panic!("block group should hold containers");
        };
        assert_eq!(container.tag().to_string(), BLOCK_CONTAINER);

        let markup = container.get_string(&txn);
        assert!(markup.contains("id=\""), "container should have an id: {markup}");
        assert!(markup.contains("<paragraph"), "container should hold a paragraph: {markup}");
        assert!(markup.contains("textAlignment=\"left\""), "{markup}");
        assert!(markup.contains("backgroundColor=\"default\""), "{markup}");
        assert!(markup.contains("textColor=\"default\""), "{markup}");
    }

    #[test]
    fn rewriting_replaces_previous_blocks() {
        let doc = YDoc::new();
        write_blocks(&doc, "blocknote", "velho\ntexto");
        write_blocks(&doc, "blocknote", "novo");
        assert_eq!(extract_text(&doc, "blocknote"), "novo");
    }

    #[test]
    fn sync_moves_text_both_ways() {
        let doc = YDoc::new();
        let keys = editor_keys("notas", Some("ideias"));

        write_blocks(&doc, &keys.rich, "um\ndois");
        doc.insert_text(&keys.code, 0, "lixo antigo");
        sync_rich_to_code(&doc, &keys);
        assert_eq!(doc.get_text_string(&keys.code), "um\ndois");

        doc.insert_text(&keys.code, 7, "\ntres");
        sync_code_to_rich(&doc, &keys);
        assert_eq!(extract_text(&doc, &keys.rich), "um\ndois\ntres");
    }
}
