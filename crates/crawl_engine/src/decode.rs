use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Decode a fetched page into UTF-8 text.
///
/// Order of precedence: BOM, then the `charset` parameter of `Content-Type`,
/// then byte-level detection. Malformed sequences become U+FFFD rather than
/// failing; a listing with a few broken characters is still worth parsing.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_param)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| detect(bytes));

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}
