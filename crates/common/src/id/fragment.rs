// Names of the shared types the two editors bind to.

use super::sanitize::sanitize_document_id;

/// XmlFragment used by the block editor on a root document.
pub const ROOT_FRAGMENT_KEY: &str = "blocknote";

/// Suffix appended to a fragment key to name the code editor's Y.Text.
const CODE_TEXT_SUFFIX: &str = "-text";

/// Shared-type names for one document or subdocument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorKeys {
    /// XmlFragment of the rich (block) editor.
    pub rich: String,
    /// Y.Text of the code editor.
    pub code: String,
}

/// Resolve the editor keys for a document, or for one of its subdocuments.
///
/// Subdocuments get `doc-{document}:subdoc-{name}` so that two documents with
/// a subdocument of the same name never share a fragment.
pub fn editor_keys(document_id: &str, subdocument: Option<&str>) -> EditorKeys {
    let rich = match subdocument {
        Some(name) => format!(
            "doc-{}:subdoc-{}",
            sanitize_document_id(document_id),
            sanitize_document_id(name)
        ),
        None => ROOT_FRAGMENT_KEY.to_string(),
    };
    let code = format!("{rich}{CODE_TEXT_SUFFIX}");
    EditorKeys { rich, code }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_document_uses_blocknote_fragment() {
        let keys = editor_keys("anything", None);
        assert_eq!(keys.rich, "blocknote");
        assert_eq!(keys.code, "blocknote-text");
    }

    #[test]
    fn subdocument_keys_are_scoped_and_sanitized() {
        let keys = editor_keys("Minha Nota", Some("Lista de Tarefas"));
        assert_eq!(keys.rich, "doc-minha-nota:subdoc-lista-de-tarefas");
        assert_eq!(keys.code, "doc-minha-nota:subdoc-lista-de-tarefas-text");
    }

    #[test]
    fn same_subdocument_name_differs_across_documents() {
        let a = editor_keys("alpha", Some("notes"));
        let b = editor_keys("beta", Some("notes"));
        assert_ne!(a.rich, b.rich);
    }
}
