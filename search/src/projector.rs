use serde_json::Value;

use crate::document::SearchDocument;
use crate::document::Subtest;

/// A persisted failure line, as read from the results database.
///
/// `test` is kept as a raw JSON value because legacy reftest rows store a
/// tuple-indexed value instead of a plain string.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureLine {
    pub id: i64,
    pub job_guid: String,
    pub test: Value,
    pub subtest: Subtest,
    pub status: String,
    pub expected: String,
    pub message: String,
    pub best_classification: Option<i64>,
    pub best_is_verified: bool,
}

/// Project a failure line into its search document.
///
/// Returns `None` for legacy rows whose `test` is not a plain string;
/// silently skipping those rows is the contract, no coercion is attempted.
pub fn project(line: &FailureLine) -> Option<SearchDocument> {
    let test = line.test.as_str()?.to_string();
    Some(SearchDocument {
        id: line.id,
        job_guid: line.job_guid.clone(),
        test,
        subtest: line.subtest.clone(),
        status: line.status.clone(),
        expected: line.expected.clone(),
        message: line.message.clone(),
        best_classification: line.best_classification,
        best_is_verified: line.best_is_verified,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn failure_line(id: i64, test: Value) -> FailureLine {
        FailureLine {
            id,
            job_guid: format!("guid-{id}"),
            test,
            subtest: Subtest::Absent,
            status: "FAIL".to_string(),
            expected: "PASS".to_string(),
            message: "assertion failed at 0xdeadbeef in frobnicate()".to_string(),
            best_classification: Some(7),
            best_is_verified: true,
        }
    }

    #[test]
    fn string_test_projects_all_nine_fields() {
        let line = failure_line(3, json!("layout/test_a.html"));
        let doc = project(&line).expect("string test must project");
        assert_eq!(doc.id, 3);
        assert_eq!(doc.job_guid, "guid-3");
        assert_eq!(doc.test, "layout/test_a.html");
        assert_eq!(doc.subtest, Subtest::Absent);
        assert_eq!(doc.status, "FAIL");
        assert_eq!(doc.expected, "PASS");
        assert_eq!(doc.message, line.message);
        assert_eq!(doc.best_classification, Some(7));
        assert!(doc.best_is_verified);
    }

    #[test]
    fn tuple_indexed_test_is_skipped() {
        let line = failure_line(4, json!([0, "foo"]));
        assert_eq!(project(&line), None);
    }

    #[test]
    fn non_string_scalars_are_skipped_too() {
        assert_eq!(project(&failure_line(5, json!(12))), None);
        assert_eq!(project(&failure_line(6, json!(null))), None);
    }

    #[test]
    fn explicit_null_subtest_is_preserved() {
        let mut line = failure_line(7, json!("t"));
        line.subtest = Subtest::Present(None);
        let doc = project(&line).expect("projects");
        assert_eq!(doc.subtest, Subtest::Present(None));
    }
}
