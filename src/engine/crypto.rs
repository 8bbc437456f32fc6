//! Standard security handler: encrypt and decrypt.
//!
//! Encryption uses the same string as user and owner password and grants
//! every permission, so the password gates opening the file and nothing
//! else.
//!
//! | Algorithm    | Handler | Cipher        |
//! |--------------|---------|---------------|
//! | `RC4-40`     | V1 / R2 | RC4, 40 bit   |
//! | `RC4-128`    | V2 / R3 | RC4, 128 bit  |
//! | `AES-128`    | V4 / R4 | AESV2 filters |
//! | `AES-256-R5` | V5 / R5 | AESV3 filters |
//! | `AES-256`    | V5 / R6 | AESV3 filters |

use crate::config::EncryptionAlgorithm;
use crate::error::ToolkitError;
use lopdf::encryption::crypt_filters::{Aes128CryptFilter, Aes256CryptFilter, CryptFilter};
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, ObjectId, Reader, StringFormat};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const OP: &str = "encryption";

/// Name of the single crypt filter installed for V4/V5 handlers.
const STD_CF: &[u8] = b"StdCF";

/// Encrypt `doc` in place.
pub fn encrypt_document(
    doc: &mut Document,
    password: &str,
    algorithm: EncryptionAlgorithm,
) -> Result<(), ToolkitError> {
    ensure_document_id(doc)?;

    let permissions = Permissions::all();
    let file_key = random_bytes::<32>()?;

    let version = match algorithm {
        EncryptionAlgorithm::Rc4_40 => EncryptionVersion::V1 {
            document: &*doc,
            owner_password: password,
            user_password: password,
            permissions,
        },
        EncryptionAlgorithm::Rc4_128 => EncryptionVersion::V2 {
            document: &*doc,
            owner_password: password,
            user_password: password,
            key_length: 128,
            permissions,
        },
        EncryptionAlgorithm::Aes128 => EncryptionVersion::V4 {
            document: &*doc,
            encrypt_metadata: true,
            crypt_filters: crypt_filters(Arc::new(Aes128CryptFilter)),
            stream_filter: STD_CF.to_vec(),
            string_filter: STD_CF.to_vec(),
            owner_password: password,
            user_password: password,
            permissions,
        },
        #[allow(deprecated)]
        EncryptionAlgorithm::Aes256R5 => EncryptionVersion::R5 {
            encrypt_metadata: true,
            crypt_filters: crypt_filters(Arc::new(Aes256CryptFilter)),
            file_encryption_key: &file_key,
            stream_filter: STD_CF.to_vec(),
            string_filter: STD_CF.to_vec(),
            owner_password: password,
            user_password: password,
            permissions,
        },
        EncryptionAlgorithm::Aes256 => EncryptionVersion::V5 {
            encrypt_metadata: true,
            crypt_filters: crypt_filters(Arc::new(Aes256CryptFilter)),
            file_encryption_key: &file_key,
            stream_filter: STD_CF.to_vec(),
            string_filter: STD_CF.to_vec(),
            owner_password: password,
            user_password: password,
            permissions,
        },
    };

    let state = EncryptionState::try_from(version)
        .map_err(|e| ToolkitError::engine(OP, format!("cannot derive {algorithm} keys: {e}")))?;
    doc.encrypt(&state)
        .map_err(|e| ToolkitError::engine(OP, e))?;

    debug!("Encrypted document with {}", algorithm);
    Ok(())
}

fn crypt_filters(filter: Arc<dyn CryptFilter>) -> BTreeMap<Vec<u8>, Arc<dyn CryptFilter>> {
    BTreeMap::from([(STD_CF.to_vec(), filter)])
}

/// Decrypt a serialised PDF with `password` and return the plain document.
///
/// `Document::load_mem` only ever tries the empty user password and keeps
/// nothing but the `/Encrypt` dictionary when that fails, so the ciphertext
/// is loaded through the plain reader instead. The trailer's `/Encrypt`
/// entry is renamed in place (same length, so xref offsets hold) and object
/// streams are tagged so the reader keeps them unexpanded. Both are restored
/// before lopdf decrypts every object with the caller's password.
///
/// Every decryption failure is reported as [`ToolkitError::WrongPassword`];
/// the cause is logged at debug level only.
pub fn decrypt_document(bytes: &[u8], password: &str) -> Result<Document, ToolkitError> {
    let masked = RE_TRAILER_ENCRYPT.replace_all(bytes, &b"/${1}X${2}"[..]);
    if masked.as_ref() == bytes {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ToolkitError::engine(DECRYPT, format!("failed to parse PDF: {e}")))?;
        return Err(if doc.is_encrypted() {
            ToolkitError::engine(DECRYPT, "encryption dictionary is not an indirect object")
        } else {
            ToolkitError::NotEncrypted
        });
    }

    let mut doc = Reader {
        buffer: masked.as_ref(),
        document: Document::new(),
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    }
    .read(Some(seal_object_stream as ObjectFilter))
    .map_err(|e| ToolkitError::engine(DECRYPT, format!("failed to parse PDF: {e}")))?;

    let encrypt = doc
        .trailer
        .remove(MASKED_KEY)
        .ok_or(ToolkitError::NotEncrypted)?;
    doc.trailer.set("Encrypt", encrypt);
    for object in doc.objects.values_mut() {
        if let Ok(stream) = object.as_stream_mut() {
            if stream.dict.has_type(SEALED_OBJSTM) {
                stream.dict.set("Type", Object::Name(b"ObjStm".to_vec()));
            }
        }
    }

    doc.decrypt(password).map_err(|e| {
        debug!("Decryption failed: {e}");
        ToolkitError::WrongPassword
    })?;
    doc.encryption_state = None;

    // Object streams have been expanded; the containers would only be
    // written out again as dead weight.
    doc.objects.retain(|_, object| {
        !object
            .as_stream()
            .is_ok_and(|s| s.dict.has_type(b"ObjStm") || s.dict.has_type(b"XRef"))
    });

    if doc.catalog().is_err() || doc.get_pages().is_empty() {
        debug!("Decrypted document has no catalog or no pages");
        return Err(ToolkitError::WrongPassword);
    }
    Ok(doc)
}

const DECRYPT: &str = "decryption";

/// Trailer key the reader sees instead of `/Encrypt`.
const MASKED_KEY: &[u8] = b"EncrypX";
const SEALED_OBJSTM: &[u8] = b"SealedObjStm";

/// `/Encrypt n g R` in a trailer or xref-stream dictionary. The replacement
/// swaps the final `t` for `X`, keeping the byte length.
static RE_TRAILER_ENCRYPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(Encryp)t(\s+\d+\s+\d+\s+R)").unwrap());

type ObjectFilter = fn(ObjectId, &mut Object) -> Option<(ObjectId, Object)>;

/// Keeps encrypted object streams away from the reader's expansion step.
fn seal_object_stream(id: ObjectId, object: &mut Object) -> Option<(ObjectId, Object)> {
    if let Ok(stream) = object.as_stream_mut() {
        if stream.dict.has_type(b"ObjStm") {
            stream.dict.set("Type", Object::Name(SEALED_OBJSTM.to_vec()));
        }
    }
    Some((id, Object::Null))
}

/// The `/ID` pair keys RC4 and AES-128 handlers. Generate one when absent.
fn ensure_document_id(doc: &mut Document) -> Result<(), ToolkitError> {
    let has_id = matches!(doc.trailer.get(b"ID"), Ok(Object::Array(a)) if a.len() == 2);
    if has_id {
        return Ok(());
    }
    let id = random_bytes::<16>()?.to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
    Ok(())
}

fn random_bytes<const N: usize>() -> Result<[u8; N], ToolkitError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf)
        .map_err(|e| ToolkitError::Internal(format!("system RNG unavailable: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::save;
    use lopdf::{dictionary, Dictionary, Stream};

    fn one_page(text: &str) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![Object::Reference(page_id)],
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc
    }

    fn first_page_text(doc: &Document) -> String {
        let id = *doc.get_pages().values().next().unwrap();
        String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned()
    }

    fn round_trip(algorithm: EncryptionAlgorithm) {
        let mut doc = one_page("Secret");
        encrypt_document(&mut doc, "hunter2", algorithm).unwrap();
        let bytes = save(&mut doc, "test").unwrap();

        assert!(
            Document::load_mem(&bytes).unwrap().is_encrypted(),
            "{algorithm} output is not encrypted"
        );

        let plain = decrypt_document(&bytes, "hunter2").unwrap();
        assert!(!plain.is_encrypted());
        assert_eq!(plain.get_pages().len(), 1);
        assert!(first_page_text(&plain).contains("(Secret)"));
    }

    #[test]
    fn rc4_40_round_trip() {
        round_trip(EncryptionAlgorithm::Rc4_40);
    }

    #[test]
    fn rc4_128_round_trip() {
        round_trip(EncryptionAlgorithm::Rc4_128);
    }

    #[test]
    fn aes_128_round_trip() {
        round_trip(EncryptionAlgorithm::Aes128);
    }

    #[test]
    fn aes_256_r5_round_trip() {
        round_trip(EncryptionAlgorithm::Aes256R5);
    }

    #[test]
    fn aes_256_round_trip() {
        round_trip(EncryptionAlgorithm::Aes256);
    }

    #[test]
    fn wrong_password_is_reported() {
        for algorithm in [EncryptionAlgorithm::Rc4_128, EncryptionAlgorithm::Aes256R5] {
            let mut doc = one_page("Secret");
            encrypt_document(&mut doc, "right", algorithm).unwrap();
            let bytes = save(&mut doc, "test").unwrap();
            assert!(matches!(
                decrypt_document(&bytes, "wrong"),
                Err(ToolkitError::WrongPassword)
            ));
        }
    }

    #[test]
    fn plain_document_is_not_encrypted_error() {
        let bytes = save(&mut one_page("x"), "test").unwrap();
        assert!(matches!(
            decrypt_document(&bytes, "pw"),
            Err(ToolkitError::NotEncrypted)
        ));
    }

    #[test]
    fn decrypted_document_without_pages_is_a_failure() {
        let mut doc = one_page("x");
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        let pages = doc.get_dictionary_mut(pages_id).unwrap();
        pages.set("Kids", Object::Array(vec![]));
        pages.set("Count", 0);
        encrypt_document(&mut doc, "pw", EncryptionAlgorithm::Aes128).unwrap();
        let bytes = save(&mut doc, "test").unwrap();

        assert!(matches!(
            decrypt_document(&bytes, "pw"),
            Err(ToolkitError::WrongPassword)
        ));
    }

    #[test]
    fn trailer_mask_keeps_length() {
        let trailer = b"trailer << /Size 9 /Root 1 0 R /Encrypt 8 0 R /ID [<00><00>] >>";
        let masked = RE_TRAILER_ENCRYPT.replace_all(trailer, &b"/${1}X${2}"[..]);
        assert_eq!(masked.len(), trailer.len());
        assert!(masked.windows(9).any(|w| w == b"/EncrypX "));
    }

    #[test]
    fn document_id_is_generated_once() {
        let mut doc = one_page("x");
        ensure_document_id(&mut doc).unwrap();
        let first = format!("{:?}", doc.trailer.get(b"ID").unwrap());
        ensure_document_id(&mut doc).unwrap();
        assert_eq!(format!("{:?}", doc.trailer.get(b"ID").unwrap()), first);
    }
}
