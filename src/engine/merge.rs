//! Page-order-preserving document concatenation.
//!
//! The algorithm:
//! 1. Renumber each source so its object IDs follow the previous one's.
//! 2. Resolve inheritable page attributes (`Resources`, `MediaBox`,
//!    `CropBox`, `Rotate`) onto each page while its own tree is still intact.
//! 3. Move every object into the destination.
//! 4. Hang all pages, in input order, under one fresh `Pages` node.
//! 5. Prune: the old catalogs and page-tree nodes are now unreachable.
//!
//! Only pages survive a merge. Document-level structures (outlines, forms,
//! named destinations) of the sources are dropped.

use crate::error::ToolkitError;
use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

const OP: &str = "merge";

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed, cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Concatenate `sources` into one document, pages in input order.
pub fn merge_documents(sources: Vec<Document>) -> Result<Document, ToolkitError> {
    if sources.is_empty() {
        return Err(ToolkitError::engine(OP, "nothing to merge"));
    }

    let version = sources
        .iter()
        .map(|d| d.version.clone())
        .max()
        .unwrap_or_else(|| "1.7".to_string());
    let mut merged = Document::with_version(version);

    let mut next_id = 1;
    let mut page_order: Vec<(ObjectId, Vec<(&'static [u8], Object)>)> = Vec::new();

    for (index, mut source) in sources.into_iter().enumerate() {
        source.renumber_objects_with(next_id);
        next_id = source.max_id + 1;

        let pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        debug!("Merging document #{} ({} pages)", index + 1, pages.len());
        for page_id in pages {
            let inherited = INHERITABLE
                .iter()
                .filter_map(|&key| inherited_attribute(&source, page_id, key).map(|v| (key, v)))
                .collect();
            page_order.push((page_id, inherited));
        }

        merged.objects.extend(source.objects);
    }
    merged.max_id = next_id - 1;

    let pages_id = merged.new_object_id();
    let mut kids = Vec::with_capacity(page_order.len());
    for (page_id, inherited) in &page_order {
        let Some(Object::Dictionary(page)) = merged.objects.get_mut(page_id) else {
            return Err(ToolkitError::engine(
                OP,
                format!("page object {page_id:?} is not a dictionary"),
            ));
        };
        for (key, value) in inherited {
            if !page.has(key) {
                page.set(key.to_vec(), value.clone());
            }
        }
        page.set("Parent", Object::Reference(pages_id));
        kids.push(Object::Reference(*page_id));
    }

    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    let pruned = merged.prune_objects();
    debug!(
        "Merged {} pages, pruned {} unreachable objects",
        page_order.len(),
        pruned.len()
    );
    Ok(merged)
}

/// Value of `key` on the page itself or the nearest ancestor that has it.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream};

    /// A document whose pages inherit MediaBox from the page tree root.
    fn doc_with_pages(labels: &[&str]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for label in labels {
            let content = format!("BT /F1 12 Tf 50 700 Td ({label}) Tj ET");
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(300), Object::Integer(400)],
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc
    }

    fn page_texts(doc: &Document) -> Vec<String> {
        doc.get_pages()
            .values()
            .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
            .collect()
    }

    #[test]
    fn pages_follow_input_order() {
        let merged = merge_documents(vec![
            doc_with_pages(&["A1", "A2"]),
            doc_with_pages(&["B1"]),
        ])
        .unwrap();
        let texts = page_texts(&merged);
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("(A1)"));
        assert!(texts[1].contains("(A2)"));
        assert!(texts[2].contains("(B1)"));
    }

    #[test]
    fn inherited_media_box_is_copied_onto_pages() {
        let merged = merge_documents(vec![doc_with_pages(&["A"]), doc_with_pages(&["B"])]).unwrap();
        for id in merged.get_pages().into_values() {
            let page = merged.get_object(id).unwrap().as_dict().unwrap();
            assert!(page.has(b"MediaBox"));
        }
    }

    #[test]
    fn old_catalogs_are_pruned() {
        let merged = merge_documents(vec![doc_with_pages(&["A"]), doc_with_pages(&["B"])]).unwrap();
        let catalogs = merged
            .objects
            .values()
            .filter(|o| {
                o.as_dict()
                    .map(|d| matches!(d.get(b"Type"), Ok(Object::Name(n)) if n == b"Catalog"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(catalogs, 1);
    }

    #[test]
    fn highest_version_wins() {
        let mut a = doc_with_pages(&["A"]);
        a.version = "1.4".into();
        let mut b = doc_with_pages(&["B"]);
        b.version = "1.7".into();
        assert_eq!(merge_documents(vec![a, b]).unwrap().version, "1.7");
    }
}
