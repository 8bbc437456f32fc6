//! In-memory PDF fixtures built with lopdf.
//!
//! Every fixture is generated on the fly, so the test suite ships no binary
//! files. Pages use the standard Helvetica font and a US Letter media box.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Read};
use std::path::Path;

/// Build a document with one page per content stream.
pub fn document(contents: Vec<String>) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
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
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// ToUnicode CMap sending glyph IDs 3..=94 to U+0020..=U+007B, the
/// layout of a typical TrueType subset.
const GLYPH_CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo <<
/Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0003> <005E> <0020>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// One page per entry of `lines`, each painted with an `Identity-H`
/// composite font whose strings only decode through its ToUnicode CMap.
pub fn composite_font_pdf(lines: &[&str]) -> Vec<u8> {
    let contents = lines
        .iter()
        .map(|line| {
            let glyphs: String = line
                .bytes()
                .map(|b| format!("{:04X}", u16::from(b) - 0x1D))
                .collect();
            format!("BT /F1 12 Tf 72 720 Td <{glyphs}> Tj ET")
        })
        .collect();
    let mut doc = document(contents);
    let cmap_id = doc.add_object(Stream::new(dictionary! {}, GLYPH_CMAP.to_vec()));
    for object in doc.objects.values_mut() {
        if let Object::Dictionary(dict) = object {
            if dict.has(b"BaseFont") {
                dict.set("Subtype", "Type0");
                dict.set("BaseFont", "ABCDEF+NotoSans");
                dict.set("Encoding", "Identity-H");
                dict.set("ToUnicode", cmap_id);
            }
        }
    }
    save(doc)
}

pub fn save(mut doc: Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("fixture saves");
    buf
}

/// Content stream painting `lines` top-down, one per baseline.
pub fn lines_content(lines: &[&str]) -> String {
    let mut s = String::from("BT /F1 12 Tf 14 TL 72 720 Td ");
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            s.push_str("T* ");
        }
        s.push_str(&format!("({}) Tj ", escape(line)));
    }
    s.push_str("ET");
    s
}

/// Content stream painting `rows` as an aligned grid, columns 120 pt apart.
pub fn grid_content(top: i32, rows: &[&[&str]]) -> String {
    let mut s = String::from("BT /F1 10 Tf ");
    for (r, row) in rows.iter().enumerate() {
        let y = top - 18 * r as i32;
        for (c, cell) in row.iter().enumerate() {
            let x = 72 + 120 * c as i32;
            s.push_str(&format!("1 0 0 1 {x} {y} Tm ({}) Tj ", escape(cell)));
        }
    }
    s.push_str("ET");
    s
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// One page per entry, each page showing its label as a single line.
pub fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
    save(document(
        labels.iter().map(|l| lines_content(&[l])).collect(),
    ))
}

/// A page with a 256×256 raw RGB gradient image: large uncompressed, tiny
/// as JPEG.
pub fn image_pdf() -> Vec<u8> {
    let mut doc = document(vec![
        "q 256 0 0 256 100 400 cm /Im1 Do Q BT /F1 12 Tf 72 720 Td (Figure 1) Tj ET".to_string(),
    ]);
    let (w, h) = (256u32, 256u32);
    let mut pixels = Vec::with_capacity((w * h * 3) as usize);
    for y in 0..h {
        for x in 0..w {
            pixels.extend_from_slice(&[x as u8, y as u8, ((x + y) / 2) as u8]);
        }
    }
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w as i64,
            "Height" => h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        pixels,
    ));

    let page_id = *doc.get_pages().values().next().expect("one page");
    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        page.set(
            "Resources",
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
        );
    }
    save(doc)
}

/// Decoded content stream of every page, in page order.
pub fn page_contents(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).expect("output parses");
    doc.get_pages()
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).expect("content")).into_owned())
        .collect()
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).expect("output parses").get_pages().len()
}

/// Text of one part of an OOXML (zip) package.
pub fn zip_part(package: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(package)).expect("valid zip");
    let mut out = String::new();
    archive
        .by_name(name)
        .expect("part exists")
        .read_to_string(&mut out)
        .expect("utf-8 part");
    out
}

pub fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).expect("output file readable")
}
