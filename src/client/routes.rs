//! Server-relative URL templates and placeholder expansion.
//!
//! Templates are expanded by literal `{name}` replacement. Parameter values
//! must be encoded with [`encode`] first; the encoding escapes braces, so a
//! substituted value can never itself look like a placeholder regardless of
//! substitution order.

use url::form_urlencoded;

pub const SIGN_IN: &str = "authentication/sign_in";

pub const EVENTS: &str = "internal-api/shared_spaces/{shared_space}/analytics/ci/events";

pub const BUILD_LOG: &str = "internal-api/shared_spaces/{shared_space}/workspaces/{workspace}\
/analytics/ci/servers/{instance}/jobs/{job}/builds/{build}/logs";

pub const SCM_DATA: &str = "internal-api/shared_spaces/{shared_space}/analytics/ci/scm-data\
?instance-id={instance}&job-ci-id={job}&build-ci-id={build}";

pub const TEST_RESULTS: &str = "internal-api/shared_spaces/{shared_space}/analytics/ci/test-results\
?skip-errors=true&instance-id={instance}&job-ci-id={job}&build-ci-id={build}";

pub const TEST_RESULTS_PREFLIGHT: &str =
    "internal-api/shared_spaces/{shared_space}/analytics/ci/servers/{instance}\
/jobs/{job}/tests-result-preflight";

pub const VULNERABILITIES: &str =
    "internal-api/shared_spaces/{shared_space}/analytics/ci/vulnerabilities\
?instance-id={instance}&job-ci-id={job}&build-ci-id={build}";

pub const TASKS: &str = "internal-api/shared_spaces/{shared_space}/analytics/ci/servers/{instance}\
/tasks?self-type={server_type}";

pub const TASK_RESULT: &str = "internal-api/shared_spaces/{shared_space}/analytics/ci/servers\
/{instance}/tasks/{task}/result";

pub const ENTITIES: &str = "api/shared_spaces/{shared_space}/workspaces/{workspace}/{collection}";

/// Percent-encodes one parameter value.
pub fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Expands `{name}` placeholders in a template.
///
/// Values are inserted as given; pass them through [`encode`] when they come
/// from user-controlled identifiers.
pub fn expand(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_build_log_route() {
        let path = expand(
            BUILD_LOG,
            &[
                ("shared_space", "1001"),
                ("workspace", "1002"),
                ("instance", "ci-1"),
                ("job", &encode("folder/job a")),
                ("build", "17"),
            ],
        );
        assert_eq!(
            path,
            "internal-api/shared_spaces/1001/workspaces/1002/analytics/ci\
/servers/ci-1/jobs/folder%2Fjob+a/builds/17/logs"
        );
    }

    #[test]
    fn test_encode_escapes_braces() {
        // An encoded value can never collide with a later placeholder.
        let tricky = encode("{job}");
        assert_eq!(tricky, "%7Bjob%7D");

        let path = expand(
            "servers/{instance}/jobs/{job}",
            &[("instance", &tricky), ("job", "real-job")],
        );
        assert_eq!(path, "servers/%7Bjob%7D/jobs/real-job");
    }

    #[test]
    fn test_expand_leaves_unknown_placeholders() {
        let path = expand("a/{x}/b/{y}", &[("x", "1")]);
        assert_eq!(path, "a/1/b/{y}");
    }
}
