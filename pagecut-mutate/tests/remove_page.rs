use std::sync::Arc;

use lopdf::{dictionary, Document, Object};
use pagecut_core::{MutationError, PageMutator};
use pagecut_mutate::{EditableDocument, LopdfMutator};

/// Builds a PDF whose page `i` (1-based) is `100 + i` points wide.
fn fixture(pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (1..=pages)
        .map(|page| {
            let width = 100 + i64::from(page);
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), 792.into()],
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(pages),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn page_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_object(*id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

#[tokio::test]
async fn removes_middle_page_and_keeps_order() {
    let bytes: Arc<[u8]> = Arc::from(fixture(3));

    let edited = LopdfMutator::new().remove_page(bytes, 1).await.unwrap();

    assert_eq!(page_widths(&edited), vec![101, 103]);
}

#[tokio::test]
async fn removing_every_page_but_one_in_sequence() {
    let mutator = LopdfMutator::new();
    let mut bytes: Arc<[u8]> = Arc::from(fixture(4));
    for _ in 0..3 {
        bytes = Arc::from(mutator.remove_page(bytes, 0).await.unwrap());
    }
    assert_eq!(page_widths(&bytes), vec![104]);
}

#[tokio::test]
async fn out_of_range_index_is_rejected() {
    let bytes: Arc<[u8]> = Arc::from(fixture(2));
    let err = LopdfMutator::new().remove_page(bytes, 2).await.unwrap_err();
    assert!(matches!(
        err,
        MutationError::PageOutOfRange {
            index: 2,
            page_count: 2
        }
    ));
}

#[tokio::test]
async fn garbage_input_is_a_parse_error() {
    let bytes: Arc<[u8]> = Arc::from(&b"definitely not a pdf"[..]);
    let err = LopdfMutator::new().remove_page(bytes, 0).await.unwrap_err();
    assert!(matches!(err, MutationError::Parse(_)));
}

#[test]
fn editable_document_steps_can_be_driven_separately() {
    let mut doc = EditableDocument::load(&fixture(5)).unwrap();
    assert_eq!(doc.page_count(), 5);

    doc.remove_page(4).unwrap();
    doc.remove_page(0).unwrap();
    assert_eq!(doc.page_count(), 3);

    let saved = doc.save().unwrap();
    assert_eq!(page_widths(&saved), vec![102, 103, 104]);
}
