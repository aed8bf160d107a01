// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use screenshot_renamer::{extract_response_text, extract_xml_tag};

#[derive(Arbitrary, Debug)]
struct TagInput {
    text: String,
    tag: String,
}

fuzz_target!(|input: TagInput| {
    let content = extract_xml_tag(&input.text, &input.tag);
    assert_eq!(content, content.trim());
    assert_eq!(content, extract_xml_tag(&input.text, &input.tag));

    let response = extract_response_text(&input.text);
    assert_eq!(response, response.trim());
    if !input.text.to_ascii_lowercase().contains("<response") {
        assert!(response.is_empty());
    }
});
