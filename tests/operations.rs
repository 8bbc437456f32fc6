//! End-to-end tests driving `PdfToolkit` with generated PDFs.
//!
//! Run with:
//!   cargo test --test operations

mod common;

use common::*;
use pdf_toolkit::engine::LoadedPdf;
use pdf_toolkit::{
    CompressionLevel, EncryptionAlgorithm, ErrorKind, Operation, OperationProgress, PageRange,
    PdfSource, PdfToolkit, RawTable, TableExtractor, ToolkitConfig, ToolkitError, WordConverter,
};
use std::io::{Cursor, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn toolkit() -> PdfToolkit {
    PdfToolkit::default()
}

/// A `.pdf`-named file whose content is plain text.
fn fake_pdf(dir: &TempDir) -> PathBuf {
    let p = dir.path().join("notes.pdf");
    std::fs::write(&p, "These are meeting notes, not a PDF.\n").unwrap();
    p
}

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let p = dir.path().join(name);
    std::fs::write(&p, bytes).unwrap();
    p
}

/// Assert `result` failed with `kind` and that nothing was written to `dest`.
macro_rules! assert_fails {
    ($result:expr, $kind:expr, $dest:expr) => {{
        let err = $result.expect_err("operation should fail");
        assert_eq!(err.kind(), $kind, "unexpected error: {err}");
        assert!(!$dest.exists(), "failed operation left {}", $dest.display());
        err
    }};
}

/// Table extractor that counts calls and returns one fixed table per page.
#[derive(Default)]
struct CountingExtractor {
    calls: AtomicUsize,
}

impl TableExtractor for CountingExtractor {
    fn extract_tables(
        &self,
        _pdf: &LoadedPdf,
        page_index: usize,
    ) -> Result<Vec<RawTable>, ToolkitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![vec![
            vec!["page".into()],
            vec![(page_index + 1).to_string()],
        ]])
    }
}

/// Word converter that records its paths and then fails.
#[derive(Default)]
struct FailingConverter {
    seen: Mutex<Vec<PathBuf>>,
    panic: bool,
}

impl WordConverter for FailingConverter {
    fn convert(
        &self,
        pdf_path: &Path,
        docx_path: &Path,
        _first: usize,
        _last: usize,
        _progress: &dyn OperationProgress,
    ) -> Result<(), ToolkitError> {
        assert!(pdf_path.exists() && docx_path.exists());
        self.seen
            .lock()
            .unwrap()
            .extend([pdf_path.to_path_buf(), docx_path.to_path_buf()]);
        if self.panic {
            panic!("converter crashed");
        }
        Err(ToolkitError::engine("Word conversion", "layout analysis failed"))
    }
}

/// Word converter that records its paths and writes a fixed document.
#[derive(Default)]
struct StubConverter {
    seen: Mutex<Vec<PathBuf>>,
}

const STUB_DOCX: &[u8] = b"PK\x03\x04 stub document";

impl WordConverter for StubConverter {
    fn convert(
        &self,
        pdf_path: &Path,
        docx_path: &Path,
        first: usize,
        last: usize,
        progress: &dyn OperationProgress,
    ) -> Result<(), ToolkitError> {
        self.seen
            .lock()
            .unwrap()
            .extend([pdf_path.to_path_buf(), docx_path.to_path_buf()]);
        std::fs::write(docx_path, STUB_DOCX)
            .map_err(|e| ToolkitError::engine("Word conversion", e.to_string()))?;
        for page in first..=last {
            progress.on_page_complete(page + 1, last - first + 1);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl OperationProgress for Recorder {
    fn on_operation_start(&self, op: Operation, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start {op} {total_pages}"));
    }
    fn on_batch_start(&self, first: usize, last: usize, _total: usize) {
        self.events.lock().unwrap().push(format!("batch {first}-{last}"));
    }
    fn on_page_complete(&self, page: usize, total: usize) {
        self.events.lock().unwrap().push(format!("page {page}/{total}"));
    }
    fn on_operation_complete(&self, op: Operation) {
        self.events.lock().unwrap().push(format!("done {op}"));
    }
}

fn table_pdf() -> Vec<u8> {
    save(document(vec![
        grid_content(
            700,
            &[&["Name", "Age", "City"], &["Ann", "31", "Oslo"], &["Bob", "40", "Rome"]],
        ),
        grid_content(700, &[&["Name", "Age"], &["Eve", "27"]]),
    ]))
}

// ── Validation ───────────────────────────────────────────────────────────────

#[test]
fn text_file_named_pdf_is_rejected_by_every_operation() {
    let dir = TempDir::new().unwrap();
    let fake = fake_pdf(&dir);
    let out = dir.path().join("out.bin");
    let tk = toolkit();

    let results = vec![
        tk.compress(&fake, Some(out.as_path()), CompressionLevel::default()),
        tk.encrypt(&fake, Some(out.as_path()), "pw", None),
        tk.decrypt(&fake, Some(out.as_path()), "pw"),
        tk.to_excel(&fake, Some(out.as_path()), None),
        tk.to_word(&fake, Some(out.as_path()), PageRange::all()),
    ];
    for result in results {
        let err = assert_fails!(result, ErrorKind::InvalidContentType, out);
        assert_eq!(err.to_string(), "File is not a valid PDF");
    }
}

#[test]
fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.pdf");
    let err = assert_fails!(
        toolkit().compress(dir.path().join("nope.pdf"), Some(out.as_path()), CompressionLevel::default()),
        ErrorKind::NotFound,
        out
    );
    assert!(err.to_string().starts_with("File not found"));
}

#[test]
fn directory_input_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.pdf");
    assert_fails!(
        toolkit().compress(dir.path(), Some(out.as_path()), CompressionLevel::default()),
        ErrorKind::UnsupportedInputType,
        out
    );
}

#[cfg(unix)]
#[test]
fn unreadable_input_is_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let locked = write_fixture(&dir, "locked.pdf", &table_pdf());
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::File::open(&locked).is_ok() {
        // Mode bits are not enforced for root.
        return;
    }
    let out = dir.path().join("out.pdf");
    let err = assert_fails!(
        toolkit().compress(&locked, Some(out.as_path()), CompressionLevel::default()),
        ErrorKind::PermissionDenied,
        out
    );
    assert!(err.to_string().starts_with("Permission denied reading"));
}

#[test]
fn oversized_input_never_reaches_the_engine() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.xlsx");
    let pdf = table_pdf();
    let config = ToolkitConfig::builder()
        .max_file_size(pdf.len() as u64 - 1)
        .build()
        .unwrap();
    let extractor = Arc::new(CountingExtractor::default());
    let tk = PdfToolkit::new(config).with_table_extractor(extractor.clone());

    let err = assert_fails!(
        tk.to_excel(pdf.as_slice(), Some(out.as_path()), None),
        ErrorKind::SizeExceeded,
        out
    );
    assert!(err.to_string().starts_with("File size exceeds the maximum limit of"));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn size_is_checked_before_content() {
    let config = ToolkitConfig::builder().max_file_size(4).build().unwrap();
    let err = PdfToolkit::new(config)
        .compress(&b"definitely not a pdf"[..], None, CompressionLevel::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeExceeded);
}

#[test]
fn stream_cursor_is_restored_on_success_and_failure() {
    let mut good = Cursor::new(labelled_pdf(&["A"]));
    good.seek(SeekFrom::Start(7)).unwrap();
    toolkit()
        .compress(PdfSource::stream(&mut good), None, CompressionLevel::default())
        .unwrap();
    assert_eq!(good.position(), 7);

    let mut bad = Cursor::new(b"plain text, long enough to sniff".to_vec());
    bad.seek(SeekFrom::Start(3)).unwrap();
    let err = toolkit()
        .compress(PdfSource::stream(&mut bad), None, CompressionLevel::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "File is not a valid PDF");
    assert_eq!(bad.position(), 3);
}

// ── Compress ─────────────────────────────────────────────────────────────────

#[test]
fn compress_image_heavy_pdf_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "sample.pdf", &image_pdf());
    let out = dir.path().join("sample.small.pdf");

    let output = toolkit()
        .compress(&input, Some(out.as_path()), CompressionLevel::new(7))
        .unwrap();
    assert_eq!(output.path(), Some(out.as_path()));

    let written = read(&out);
    assert!(!written.is_empty());
    assert!(written.len() <= std::fs::metadata(&input).unwrap().len() as usize);
    assert_eq!(page_count(&written), 1);
}

#[test]
fn compress_without_destination_returns_bytes() {
    let pdf = labelled_pdf(&["one", "two"]);
    let output = toolkit()
        .compress(pdf.as_slice(), None, CompressionLevel::new(42))
        .unwrap();
    let bytes = output.into_bytes().expect("bytes output");
    assert!(bytes.starts_with(b"%PDF-"));
    let contents = page_contents(&bytes);
    assert!(contents[0].contains("(one)"));
    assert!(contents[1].contains("(two)"));
}

#[test]
fn compress_refuses_encrypted_input() {
    let locked = toolkit()
        .encrypt(labelled_pdf(&["x"]), None, "pw", None)
        .unwrap()
        .into_bytes()
        .unwrap();
    let err = toolkit()
        .compress(locked, None, CompressionLevel::default())
        .unwrap_err();
    assert!(matches!(err, ToolkitError::Encrypted));
}

// ── Merge ────────────────────────────────────────────────────────────────────

#[test]
fn merge_keeps_input_order() {
    let dir = TempDir::new().unwrap();
    let a = write_fixture(&dir, "a.pdf", &labelled_pdf(&["A1", "A2"]));
    let b = write_fixture(&dir, "b.pdf", &labelled_pdf(&["B1"]));
    let out = dir.path().join("merged.pdf");

    toolkit()
        .merge(vec![a.into(), b.into()], Some(out.as_path()))
        .unwrap();

    let contents = page_contents(&read(&out));
    assert_eq!(contents.len(), 3);
    for (content, label) in contents.iter().zip(["A1", "A2", "B1"]) {
        assert!(content.contains(&format!("({label})")), "{content}");
    }
}

#[test]
fn merging_in_steps_matches_merging_at_once() {
    let (a, b, c) = (
        labelled_pdf(&["A"]),
        labelled_pdf(&["B1", "B2"]),
        labelled_pdf(&["C"]),
    );
    let tk = toolkit();

    let ab = tk
        .merge(vec![a.clone().into(), b.clone().into()], None)
        .unwrap()
        .into_bytes()
        .unwrap();
    let stepwise = tk
        .merge(vec![ab.into(), c.clone().into()], None)
        .unwrap()
        .into_bytes()
        .unwrap();
    let direct = tk
        .merge(vec![a.into(), b.into(), c.into()], None)
        .unwrap()
        .into_bytes()
        .unwrap();

    assert_eq!(page_contents(&stepwise), page_contents(&direct));
}

#[test]
fn merge_needs_two_inputs() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("merged.pdf");
    let tk = toolkit();

    let err = assert_fails!(tk.merge(vec![], Some(out.as_path())), ErrorKind::InvalidArgument, out);
    assert_eq!(err.to_string(), "No PDF files provided for merging");

    let err = assert_fails!(
        tk.merge(vec![labelled_pdf(&["A"]).into()], Some(out.as_path())),
        ErrorKind::InvalidArgument,
        out
    );
    assert_eq!(err.to_string(), "At least two PDF files are required for merging");
}

#[test]
fn merge_reports_first_invalid_input_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let good = write_fixture(&dir, "good.pdf", &labelled_pdf(&["A"]));
    let fake = fake_pdf(&dir);
    let out = dir.path().join("merged.pdf");

    let err = assert_fails!(
        toolkit().merge(
            vec![good.clone().into(), fake.into(), dir.path().join("missing.pdf").into()],
            Some(out.as_path())
        ),
        ErrorKind::InvalidContentType,
        out
    );
    assert_eq!(
        err.to_string(),
        "Validation failed for PDF #2: File is not a valid PDF"
    );
}

#[test]
fn merge_accepts_mixed_source_kinds() {
    let mut stream = Cursor::new(labelled_pdf(&["S"]));
    let bytes = labelled_pdf(&["B"]);
    let merged = toolkit()
        .merge(
            vec![bytes.as_slice().into(), PdfSource::stream(&mut stream)],
            None,
        )
        .unwrap()
        .into_bytes()
        .unwrap();
    assert_eq!(page_count(&merged), 2);
    assert_eq!(stream.position(), 0);
}

// ── Encrypt / decrypt ────────────────────────────────────────────────────────

#[test]
fn encrypt_then_decrypt_round_trips() {
    let original = labelled_pdf(&["Quarterly", "Figures"]);
    let tk = toolkit();

    for algorithm in [
        EncryptionAlgorithm::Rc4_40,
        EncryptionAlgorithm::Rc4_128,
        EncryptionAlgorithm::Aes128,
        EncryptionAlgorithm::Aes256R5,
        EncryptionAlgorithm::Aes256,
    ] {
        let locked = tk
            .encrypt(original.as_slice(), None, "s3cret", Some(algorithm))
            .unwrap()
            .into_bytes()
            .unwrap();
        assert!(lopdf::Document::load_mem(&locked).unwrap().is_encrypted());

        let opened = tk
            .decrypt(locked, None, "s3cret")
            .unwrap()
            .into_bytes()
            .unwrap();
        assert_eq!(page_count(&opened), 2, "{algorithm}");
        assert_eq!(page_contents(&opened), page_contents(&original), "{algorithm}");
    }
}

#[test]
fn wrong_password_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let locked = write_fixture(
        &dir,
        "locked.pdf",
        &toolkit()
            .encrypt(labelled_pdf(&["x"]), None, "right", None)
            .unwrap()
            .into_bytes()
            .unwrap(),
    );
    let out = dir.path().join("open.pdf");

    let err = assert_fails!(
        toolkit().decrypt(&locked, Some(out.as_path()), "wrong"),
        ErrorKind::WrongPassword,
        out
    );
    assert_eq!(err.to_string(), "Incorrect password or failed to decrypt the PDF");
}

#[test]
fn decrypting_a_plain_pdf_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("open.pdf");
    let err = assert_fails!(
        toolkit().decrypt(labelled_pdf(&["x"]), Some(out.as_path()), "pw"),
        ErrorKind::EncryptionState,
        out
    );
    assert_eq!(err.to_string(), "The PDF is not encrypted");
}

#[test]
fn empty_password_is_rejected() {
    let tk = toolkit();
    let err = tk.encrypt(labelled_pdf(&["x"]), None, "", None).unwrap_err();
    assert_eq!(err.to_string(), "Password is required for encryption");
    let err = tk.decrypt(labelled_pdf(&["x"]), None, "").unwrap_err();
    assert_eq!(err.to_string(), "Password is required for decryption");
}

#[test]
fn encrypting_twice_is_rejected() {
    let tk = toolkit();
    let locked = tk
        .encrypt(labelled_pdf(&["x"]), None, "pw", None)
        .unwrap()
        .into_bytes()
        .unwrap();
    assert!(matches!(
        tk.encrypt(locked, None, "pw", None),
        Err(ToolkitError::AlreadyEncrypted)
    ));
}

#[test]
fn unknown_algorithm_name_is_rejected() {
    let err = "Blowfish".parse::<EncryptionAlgorithm>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

// ── Convert to Excel ─────────────────────────────────────────────────────────

#[test]
fn tables_from_all_pages_land_in_one_sheet() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tables.xlsx");
    toolkit().to_excel(table_pdf(), Some(out.as_path()), None).unwrap();

    let xlsx = read(&out);
    let sheet = zip_part(&xlsx, "xl/worksheets/sheet1.xml");
    // Header row, bold.
    assert!(sheet.contains(r#"<c r="A1" t="inlineStr" s="1"><is><t xml:space="preserve">Name</t>"#));
    assert!(sheet.contains(r#"<c r="C1" t="inlineStr" s="1"><is><t xml:space="preserve">City</t>"#));
    // Page 1 rows, then page 2 with its missing City left blank.
    assert!(sheet.contains(r#"<c r="A2" t="inlineStr"><is><t xml:space="preserve">Ann</t>"#));
    assert!(sheet.contains(r#"<c r="C3" t="inlineStr"><is><t xml:space="preserve">Rome</t>"#));
    assert!(sheet.contains(r#"<c r="A4" t="inlineStr"><is><t xml:space="preserve">Eve</t>"#));
    assert!(!sheet.contains(r#"r="C4""#));
    assert!(zip_part(&xlsx, "xl/workbook.xml").contains(r#"name="Sheet1""#));
}

#[test]
fn batch_size_does_not_change_output() {
    let tk = toolkit();
    let sheet = |batch| {
        let xlsx = tk
            .to_excel(table_pdf(), None, Some(batch))
            .unwrap()
            .into_bytes()
            .unwrap();
        zip_part(&xlsx, "xl/worksheets/sheet1.xml")
    };
    assert_eq!(sheet(1), sheet(5));
}

#[test]
fn pages_are_processed_in_batches() {
    let pdf = labelled_pdf(&["1", "2", "3", "4", "5", "6", "7"]);
    let recorder = Arc::new(Recorder::default());
    let extractor = Arc::new(CountingExtractor::default());
    let tk = toolkit()
        .with_progress(recorder.clone())
        .with_table_extractor(extractor.clone());

    tk.to_excel(pdf, None, Some(3)).unwrap();

    let batches: Vec<String> = recorder
        .events()
        .into_iter()
        .filter(|e| e.starts_with("batch"))
        .collect();
    assert_eq!(batches, vec!["batch 1-3", "batch 4-6", "batch 7-7"]);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 7);
    let events = recorder.events();
    assert_eq!(events.first().map(String::as_str), Some("start to-excel 7"));
    assert_eq!(events.last().map(String::as_str), Some("done to-excel"));
}

#[test]
fn no_tables_is_a_failure_without_output() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("none.xlsx");
    let err = assert_fails!(
        toolkit().to_excel(labelled_pdf(&["Just prose."]), Some(out.as_path()), None),
        ErrorKind::NoDataExtracted,
        out
    );
    assert_eq!(err.to_string(), "No tables found in the PDF");
}

// ── Convert to Word ──────────────────────────────────────────────────────────

#[test]
fn word_conversion_keeps_text_and_page_breaks() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("doc.docx");
    toolkit()
        .to_word(labelled_pdf(&["Intro & scope", "Results"]), Some(out.as_path()), PageRange::all())
        .unwrap();

    let document = zip_part(&read(&out), "word/document.xml");
    assert!(document.contains(r#"<w:t xml:space="preserve">Intro &amp; scope</w:t>"#));
    assert!(document.contains(r#"<w:t xml:space="preserve">Results</w:t>"#));
    assert_eq!(document.matches(r#"w:type="page""#).count(), 1);
}

#[test]
fn word_conversion_decodes_composite_fonts() {
    let docx = toolkit()
        .to_word(composite_font_pdf(&["Net revenue", "Outlook"]), None, PageRange::all())
        .unwrap()
        .into_bytes()
        .unwrap();
    let document = zip_part(&docx, "word/document.xml");
    assert!(document.contains(r#"<w:t xml:space="preserve">Net revenue</w:t>"#));
    assert!(document.contains(r#"<w:t xml:space="preserve">Outlook</w:t>"#));
}

#[test]
fn word_conversion_honours_page_range() {
    let docx = toolkit()
        .to_word(labelled_pdf(&["P0", "P1", "P2"]), None, PageRange::new(1, Some(99)))
        .unwrap()
        .into_bytes()
        .unwrap();
    let document = zip_part(&docx, "word/document.xml");
    assert!(!document.contains(">P0<"));
    assert!(document.contains(">P1<"));
    assert!(document.contains(">P2<"));
}

#[test]
fn word_conversion_rejects_bad_ranges() {
    let tk = toolkit();
    let pdf = labelled_pdf(&["P0", "P1"]);
    assert!(matches!(
        tk.to_word(pdf.as_slice(), None, PageRange::new(2, None)),
        Err(ToolkitError::PageOutOfRange { page: 2, total: 2 })
    ));
    assert!(matches!(
        tk.to_word(pdf.as_slice(), None, PageRange::new(1, Some(0))),
        Err(ToolkitError::InvalidConfig(_))
    ));
}

#[test]
fn word_temp_files_are_removed_when_the_converter_fails() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("doc.docx");
    let converter = Arc::new(FailingConverter::default());
    let tk = toolkit().with_word_converter(converter.clone());

    assert_fails!(
        tk.to_word(labelled_pdf(&["x"]), Some(out.as_path()), PageRange::all()),
        ErrorKind::EngineFailure,
        out
    );

    let seen = converter.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    for path in seen {
        assert!(!path.exists(), "temp file left behind: {}", path.display());
    }
}

#[test]
fn word_temp_files_are_removed_after_success() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("doc.docx");
    let converter = Arc::new(StubConverter::default());
    toolkit()
        .with_word_converter(converter.clone())
        .to_word(labelled_pdf(&["a", "b"]), Some(out.as_path()), PageRange::all())
        .unwrap();

    assert_eq!(read(&out), STUB_DOCX);
    let seen = converter.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    for path in seen {
        assert!(!path.exists(), "temp file left behind: {}", path.display());
    }
}

#[test]
fn word_converter_panic_becomes_engine_failure() {
    let converter = Arc::new(FailingConverter {
        panic: true,
        ..FailingConverter::default()
    });
    let err = toolkit()
        .with_word_converter(converter.clone())
        .to_word(labelled_pdf(&["x"]), None, PageRange::all())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert!(err.to_string().contains("engine panicked: converter crashed"));
    for path in converter.seen.lock().unwrap().iter() {
        assert!(!path.exists());
    }
}
