//! Tests for utils module functionality.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_RANGE};
use shardload::utils::{
    header_content_length, parse_content_range, parse_content_range_total, total_size,
    ContentRange,
};

fn content_range_cases() -> Vec<(&'static str, Option<u64>)> {
    vec![
        ("bytes 0-1023/2048", Some(2048)),
        ("bytes 200-1023/5000", Some(5000)),
        ("bytes 0-0/1", Some(1)),
        ("bytes */0", Some(0)),
        ("invalid", None),
        ("bytes 0-1023", None),
        ("", None),
    ]
}

#[test]
fn test_parse_content_range_total() {
    for (header, expected) in content_range_cases() {
        assert_eq!(parse_content_range_total(header), expected, "header {:?}", header);
    }
}

#[test]
fn test_parse_content_range_total_edge_cases() {
    assert_eq!(parse_content_range_total("bytes 0-1023/ 2048 "), Some(2048));
    assert_eq!(parse_content_range_total("bytes 0-0/0"), Some(0));
    assert_eq!(
        parse_content_range_total("bytes 0-1023/999999999999"),
        Some(999999999999)
    );
}

#[test]
fn test_parse_content_range_bounds() {
    assert_eq!(
        parse_content_range("bytes 4194304-8388607/10485760"),
        Some(ContentRange {
            start: 4_194_304,
            end: 8_388_607,
            total: Some(10_485_760),
        })
    );
    assert_eq!(
        parse_content_range(" bytes 5-9/* "),
        Some(ContentRange {
            start: 5,
            end: 9,
            total: None,
        })
    );
    // Unsatisfied ranges carry no bounds.
    assert_eq!(parse_content_range("bytes */1000"), None);
}

#[test]
fn test_header_content_length() {
    let mut headers = HeaderMap::new();
    assert_eq!(header_content_length(&headers), None);

    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1024"));
    assert_eq!(header_content_length(&headers), Some(1024));

    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
    assert_eq!(header_content_length(&headers), None);
}

#[test]
fn test_total_size_from_unsatisfied_range() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes */0"));
    assert_eq!(total_size(&headers), Some(0));
}
