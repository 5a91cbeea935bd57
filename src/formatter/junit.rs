// ABOUTME: JUnit XML rendering of a deploy's test run.
// ABOUTME: One suite per deploy, one testcase per test method.

use crate::deploy::{DeployResult, RunTestResult};

use super::xml_escape;

fn seconds(ms: f64) -> String {
    format!("{:.3}", ms / 1000.0)
}

pub fn render_junit(result: &DeployResult, run: &RunTestResult) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuites>\n");
    xml.push_str(&format!(
        "    <testsuite name=\"force.apex\" timestamp=\"{}\" hostname=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"0\" time=\"{}\">\n",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S"),
        xml_escape(result.id.as_str()),
        run.num_tests_run,
        run.num_failures,
        seconds(run.total_time)
    ));

    for test in &run.successes {
        xml.push_str(&format!(
            "        <testcase name=\"{}\" classname=\"{}\" time=\"{}\"/>\n",
            xml_escape(&test.method_name),
            xml_escape(&test.name),
            seconds(test.time)
        ));
    }

    for test in &run.failures {
        xml.push_str(&format!(
            "        <testcase name=\"{}\" classname=\"{}\" time=\"{}\">\n",
            xml_escape(&test.method_name),
            xml_escape(&test.name),
            seconds(test.time)
        ));
        xml.push_str(&format!(
            "            <failure message=\"{}\">",
            xml_escape(&test.message)
        ));
        if let Some(trace) = &test.stack_trace {
            xml.push_str(&xml_escape(trace));
        }
        xml.push_str("</failure>\n        </testcase>\n");
    }

    xml.push_str("    </testsuite>\n</testsuites>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::fixtures::tested_result;

    #[test]
    fn renders_suite_cases_and_escaped_failures() {
        let result = tested_result();
        let run = result.details.run_test_result.clone().unwrap();
        let xml = render_junit(&result, &run);

        assert!(xml.contains("tests=\"2\" failures=\"1\""));
        assert!(xml.contains("time=\"0.120\""));
        assert!(xml.contains("<testcase name=\"passes\" classname=\"FooTest\" time=\"0.050\"/>"));
        assert!(xml.contains("<failure message=\"Assertion &lt;failed&gt;\">Class.FooTest.fails: line 9</failure>"));
    }
}
