// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Round-trip check that the text model answers and can be parsed

use tracing::info;
use uuid::Uuid;

use crate::ollama::TextGenerator;
use crate::tags::extract_xml_tag;
use crate::{RenamerError, Result};

/// Two operands in `10..=99`
pub fn random_operands() -> (i64, i64) {
    let bytes = Uuid::new_v4().into_bytes();
    (10 + i64::from(bytes[0] % 90), 10 + i64::from(bytes[1] % 90))
}

pub fn arithmetic_prompt(a: i64, b: i64) -> String {
    format!(
        "What is {} + {}? Provide just the integer answer inside <answer></answer> tags, \
         with no punctuation or explanation.",
        a, b
    )
}

/// Parse the model's answer, preferring an `<answer>` tag over the raw text
pub fn parse_answer(response: &str) -> Option<i64> {
    let tagged = extract_xml_tag(response, "answer");
    let answer = if tagged.is_empty() { response.trim() } else { tagged.as_str() };
    answer.parse().ok()
}

/// Ask the model to add two numbers and verify the answer
pub async fn run(model: &dyn TextGenerator) -> Result<()> {
    let (a, b) = random_operands();
    run_with(model, a, b).await
}

pub async fn run_with(model: &dyn TextGenerator, a: i64, b: i64) -> Result<()> {
    info!("Running self-test against {}...", model.name());
    let response = model.generate(&arithmetic_prompt(a, b)).await?;

    let answer = parse_answer(&response).ok_or_else(|| {
        RenamerError::SelfTest(format!("Response was not a valid number: {}", response))
    })?;

    if answer != a + b {
        return Err(RenamerError::SelfTest(format!(
            "Expected {}, but got {}",
            a + b,
            answer
        )));
    }

    info!("SUCCESS! {} + {} = {}", a, b, answer);
    Ok(())
}
