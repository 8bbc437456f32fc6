//! Operation wrappers, one file per operation.
//!
//! Every operation is an inherent method on [`crate::PdfToolkit`] and
//! returns `Result<OperationOutput, ToolkitError>`:
//!
//! | Method                       | Inputs | Engine                           |
//! |------------------------------|--------|----------------------------------|
//! | [`compress`](crate::PdfToolkit::compress)     | 1      | recompression + orphan pruning   |
//! | [`merge`](crate::PdfToolkit::merge)           | ≥ 2    | page concatenation               |
//! | [`encrypt`](crate::PdfToolkit::encrypt)       | 1      | standard security handler        |
//! | [`decrypt`](crate::PdfToolkit::decrypt)       | 1      | standard security handler        |
//! | [`to_excel`](crate::PdfToolkit::to_excel)     | 1      | `TableExtractor` + `SpreadsheetWriter` |
//! | [`to_word`](crate::PdfToolkit::to_word)       | 1      | `WordConverter`                  |
//!
//! Validation always completes before any engine runs, and the destination
//! is written atomically, so a failed operation never leaves a partial file.

mod compress;
mod encryption;
mod excel;
mod merge;
mod word;
