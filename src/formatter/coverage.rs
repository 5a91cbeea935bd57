// ABOUTME: Code coverage rendering in json, lcov, text-summary, and cobertura formats.
// ABOUTME: Only uncovered lines are known; covered lines are reported as counts.

use serde::Serialize;

use crate::deploy::{CodeCoverage, RunTestResult};

use super::{CoverageFormat, FormatError, xml_escape};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonCoverage<'a> {
    name: &'a str,
    total_lines: u32,
    covered_lines: u32,
    percent: f64,
    uncovered_lines: Vec<u32>,
}

fn totals(classes: &[CodeCoverage]) -> (u32, u32) {
    classes.iter().fold((0, 0), |(total, covered), c| {
        (total + c.num_locations, covered + c.covered())
    })
}

fn rate(covered: u32, total: u32) -> f64 {
    if total == 0 {
        1.0
    } else {
        f64::from(covered) / f64::from(total)
    }
}

pub fn render_coverage(format: CoverageFormat, run: &RunTestResult) -> Result<String, FormatError> {
    let classes = &run.code_coverage;
    Ok(match format {
        CoverageFormat::Json => {
            let rows: Vec<JsonCoverage<'_>> = classes
                .iter()
                .map(|c| JsonCoverage {
                    name: &c.name,
                    total_lines: c.num_locations,
                    covered_lines: c.covered(),
                    percent: c.percent(),
                    uncovered_lines: c.locations_not_covered.iter().map(|l| l.line).collect(),
                })
                .collect();
            serde_json::to_string_pretty(&rows)?
        }
        CoverageFormat::Lcovonly => {
            let mut out = String::new();
            for class in classes {
                out.push_str(&format!("TN:\nSF:{}\n", class.name));
                for location in &class.locations_not_covered {
                    out.push_str(&format!("DA:{},0\n", location.line));
                }
                out.push_str(&format!(
                    "LF:{}\nLH:{}\nend_of_record\n",
                    class.num_locations,
                    class.covered()
                ));
            }
            out
        }
        CoverageFormat::TextSummary => {
            let (total, covered) = totals(classes);
            format!(
                "\n=============================== Coverage summary ===============================\nLines        : {:.2}% ( {}/{} )\n================================================================================\n",
                rate(covered, total) * 100.0,
                covered,
                total
            )
        }
        CoverageFormat::Cobertura => {
            let (total, covered) = totals(classes);
            let mut xml = String::from("<?xml version=\"1.0\" ?>\n");
            xml.push_str(&format!(
                "<coverage lines-valid=\"{total}\" lines-covered=\"{covered}\" line-rate=\"{:.4}\" branches-valid=\"0\" branches-covered=\"0\" branch-rate=\"1\" timestamp=\"{}\" version=\"0.1\">\n",
                rate(covered, total),
                chrono::Utc::now().timestamp_millis()
            ));
            xml.push_str("  <packages>\n    <package name=\"main\" line-rate=\"");
            xml.push_str(&format!("{:.4}\" branch-rate=\"1\">\n      <classes>\n", rate(covered, total)));
            for class in classes {
                let name = xml_escape(&class.name);
                xml.push_str(&format!(
                    "        <class name=\"{name}\" filename=\"{name}\" line-rate=\"{:.4}\" branch-rate=\"1\">\n          <methods/>\n          <lines>\n",
                    rate(class.covered(), class.num_locations)
                ));
                for location in &class.locations_not_covered {
                    xml.push_str(&format!(
                        "            <line number=\"{}\" hits=\"0\" branch=\"false\"/>\n",
                        location.line
                    ));
                }
                xml.push_str("          </lines>\n        </class>\n");
            }
            xml.push_str("      </classes>\n    </package>\n  </packages>\n</coverage>\n");
            xml
        }
    })
}
