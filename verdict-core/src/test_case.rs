// Copyright 2025 Verdict (https://github.com/verdict-rs/verdict)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The `TestCase` record: one unit of input/output data to be scored
//!
//! `input` and `actual_output` are mandatory; everything else is optional
//! and defaults to absent, never to an empty sequence. "Absent" and "empty
//! list" are distinct observable states: a metric may treat an explicitly
//! empty context as a measured failure while skipping an absent one.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One unit of evaluation data, read-only once constructed.
///
/// `context` holds ground-truth reference snippets from the evaluation
/// dataset; `retrieval_context` holds what a retrieval subsystem actually
/// returned at run time. The two are structurally identical but are
/// separate entities and are never unioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TestCaseData")]
pub struct TestCase {
    input: String,
    actual_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retrieval_context: Option<Vec<String>>,
}

impl TestCase {
    /// Create a test case from the two mandatory fields.
    ///
    /// Fails with [`ValidationError::MissingInput`] when `input` is blank.
    pub fn new(
        input: impl Into<String>,
        actual_output: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::builder()
            .input(input)
            .actual_output(actual_output)
            .build()
    }

    /// Start building a test case field by field.
    pub fn builder() -> TestCaseBuilder {
        TestCaseBuilder::default()
    }

    /// Attach the reference answer some metrics compare against.
    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = Some(expected_output.into());
        self
    }

    /// Attach ground-truth context snippets from the evaluation dataset.
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach the snippets a retrieval subsystem returned at run time.
    pub fn with_retrieval_context(mut self, retrieval_context: Vec<String>) -> Self {
        self.retrieval_context = Some(retrieval_context);
        self
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn actual_output(&self) -> &str {
        &self.actual_output
    }

    pub fn expected_output(&self) -> Option<&str> {
        self.expected_output.as_deref()
    }

    pub fn context(&self) -> Option<&[String]> {
        self.context.as_deref()
    }

    pub fn retrieval_context(&self) -> Option<&[String]> {
        self.retrieval_context.as_deref()
    }

    /// Stable content hash over all five fields, hex-encoded blake3.
    ///
    /// Every field is hashed with a presence byte and length prefixes, so
    /// an absent sequence hashes differently from an empty one and equal
    /// payloads in `context` vs `retrieval_context` hash differently.
    pub fn content_fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hash_text(&mut hasher, Some(&self.input));
        hash_text(&mut hasher, Some(&self.actual_output));
        hash_text(&mut hasher, self.expected_output.as_deref());
        hash_snippets(&mut hasher, self.context.as_deref());
        hash_snippets(&mut hasher, self.retrieval_context.as_deref());
        hex::encode(hasher.finalize().as_bytes())
    }
}

fn hash_text(hasher: &mut blake3::Hasher, value: Option<&str>) {
    match value {
        Some(text) => {
            hasher.update(&[1]);
            hasher.update(&(text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

fn hash_snippets(hasher: &mut blake3::Hasher, value: Option<&[String]>) {
    match value {
        Some(items) => {
            hasher.update(&[1]);
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                hasher.update(&(item.len() as u64).to_le_bytes());
                hasher.update(item.as_bytes());
            }
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

/// Field-by-field builder for [`TestCase`].
///
/// `build` is the single validation point: omitting `input` or
/// `actual_output` fails, omitting any optional field does not.
#[derive(Debug, Clone, Default)]
pub struct TestCaseBuilder {
    input: Option<String>,
    actual_output: Option<String>,
    expected_output: Option<String>,
    context: Option<Vec<String>>,
    retrieval_context: Option<Vec<String>>,
}

impl TestCaseBuilder {
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn actual_output(mut self, actual_output: impl Into<String>) -> Self {
        self.actual_output = Some(actual_output.into());
        self
    }

    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = Some(expected_output.into());
        self
    }

    pub fn context(mut self, context: Vec<String>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn retrieval_context(mut self, retrieval_context: Vec<String>) -> Self {
        self.retrieval_context = Some(retrieval_context);
        self
    }

    pub fn build(self) -> Result<TestCase, ValidationError> {
        let input = self.input.ok_or(ValidationError::MissingInput)?;
        if input.trim().is_empty() {
            return Err(ValidationError::MissingInput);
        }
        let actual_output = self
            .actual_output
            .ok_or(ValidationError::MissingActualOutput)?;

        Ok(TestCase {
            input,
            actual_output,
            expected_output: self.expected_output,
            context: self.context,
            retrieval_context: self.retrieval_context,
        })
    }
}

/// Wire shape for deserialization, routed through the validating builder so
/// persisted or hand-written JSON cannot bypass the construction contract.
#[derive(Debug, Deserialize)]
struct TestCaseData {
    input: String,
    actual_output: String,
    #[serde(default)]
    expected_output: Option<String>,
    #[serde(default)]
    context: Option<Vec<String>>,
    #[serde(default)]
    retrieval_context: Option<Vec<String>>,
}

impl TryFrom<TestCaseData> for TestCase {
    type Error = ValidationError;

    fn try_from(data: TestCaseData) -> Result<Self, Self::Error> {
        let mut builder = TestCase::builder()
            .input(data.input)
            .actual_output(data.actual_output);
        if let Some(expected_output) = data.expected_output {
            builder = builder.expected_output(expected_output);
        }
        if let Some(context) = data.context {
            builder = builder.context(context);
        }
        if let Some(retrieval_context) = data.retrieval_context {
            builder = builder.retrieval_context(retrieval_context);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mandatory_fields() {
        let case = TestCase::new("What is the capital of France?", "Paris").unwrap();
        assert_eq!(case.input(), "What is the capital of France?");
        assert_eq!(case.actual_output(), "Paris");
        assert!(case.expected_output().is_none());
        assert!(case.context().is_none());
        assert!(case.retrieval_context().is_none());
    }

    #[test]
    fn test_blank_input_rejected() {
        assert_eq!(
            TestCase::new("", "output").unwrap_err(),
            ValidationError::MissingInput
        );
        assert_eq!(
            TestCase::new("   \n", "output").unwrap_err(),
            ValidationError::MissingInput
        );
    }

    #[test]
    fn test_empty_actual_output_accepted() {
        // Empty output is a legitimate model response; only omission fails.
        let case = TestCase::new("prompt", "").unwrap();
        assert_eq!(case.actual_output(), "");
    }

    #[test]
    fn test_builder_omissions() {
        let err = TestCase::builder().actual_output("out").build().unwrap_err();
        assert_eq!(err, ValidationError::MissingInput);

        let err = TestCase::builder().input("prompt").build().unwrap_err();
        assert_eq!(err, ValidationError::MissingActualOutput);

        // Omitting every optional field never fails.
        let case = TestCase::builder()
            .input("prompt")
            .actual_output("out")
            .build()
            .unwrap();
        assert!(case.expected_output().is_none());
    }

    #[test]
    fn test_context_fields_stay_distinct() {
        let context = vec!["fact one".to_string(), "fact two".to_string()];
        let retrieval = vec!["chunk b".to_string(), "chunk a".to_string(), "chunk a".to_string()];

        let case = TestCase::new("prompt", "out")
            .unwrap()
            .with_context(context.clone())
            .with_retrieval_context(retrieval.clone());

        // Order preserved, duplicates preserved, fields not conflated.
        assert_eq!(case.context(), Some(context.as_slice()));
        assert_eq!(case.retrieval_context(), Some(retrieval.as_slice()));
    }

    #[test]
    fn test_absent_differs_from_empty() {
        let absent = TestCase::new("prompt", "out").unwrap();
        let empty = TestCase::new("prompt", "out").unwrap().with_context(vec![]);

        assert!(absent.context().is_none());
        assert_eq!(empty.context(), Some(&[][..]));
        assert_ne!(absent.content_fingerprint(), empty.content_fingerprint());
    }

    #[test]
    fn test_fingerprint_separates_context_kinds() {
        let snippets = vec!["shared snippet".to_string()];
        let as_context = TestCase::new("prompt", "out")
            .unwrap()
            .with_context(snippets.clone());
        let as_retrieval = TestCase::new("prompt", "out")
            .unwrap()
            .with_retrieval_context(snippets);

        assert_ne!(
            as_context.content_fingerprint(),
            as_retrieval.content_fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = TestCase::new("prompt", "out")
            .unwrap()
            .with_expected_output("expected");
        let b = TestCase::new("prompt", "out")
            .unwrap()
            .with_expected_output("expected");
        assert_eq!(a.content_fingerprint(), b.content_fingerprint());
    }

    #[test]
    fn test_serde_round_trip() {
        let case = TestCase::new("prompt", "out")
            .unwrap()
            .with_expected_output("expected")
            .with_retrieval_context(vec!["chunk".to_string()]);

        let json = serde_json::to_string(&case).unwrap();
        let back: TestCase = serde_json::from_str(&json).unwrap();
        assert_eq!(case, back);
    }

    #[test]
    fn test_deserialization_validates() {
        let err = serde_json::from_str::<TestCase>(r#"{"input": "  ", "actual_output": "out"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("input"));
    }
}
