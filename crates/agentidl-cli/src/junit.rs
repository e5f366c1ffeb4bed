//! JUnit-style XML for scenario runs

use agentidl_core::scenario::ScenarioOutcome;

/// One reported test case: a finished scenario, or a file that never ran
pub enum CaseResult {
    Ran(ScenarioOutcome),
    Broken { name: String, message: String },
}

pub struct Case {
    pub suite: String,
    pub result: CaseResult,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render(cases: &[Case]) -> String {
    let failures = cases
        .iter()
        .filter(|c| matches!(&c.result, CaseResult::Ran(o) if !o.passed))
        .count();
    let errors = cases
        .iter()
        .filter(|c| matches!(c.result, CaseResult::Broken { .. }))
        .count();
    let total_ms: u128 = cases
        .iter()
        .map(|c| match &c.result {
            CaseResult::Ran(o) => o.duration_ms,
            CaseResult::Broken { .. } => 0,
        })
        .sum();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<testsuite name=\"agentidl\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">\n",
        cases.len(),
        failures,
        errors,
        total_ms as f64 / 1000.0
    ));

    for case in cases {
        match &case.result {
            CaseResult::Ran(outcome) => {
                xml.push_str(&format!(
                    "  <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\"",
                    escape(&outcome.name),
                    escape(&case.suite),
                    outcome.duration_ms as f64 / 1000.0
                ));
                if outcome.passed {
                    xml.push_str("/>\n");
                    continue;
                }
                xml.push_str(">\n");
                let mut detail: Vec<String> = outcome.findings.iter().map(|f| f.to_string()).collect();
                if let Some(error) = &outcome.error {
                    detail.push(error.clone());
                }
                xml.push_str(&format!(
                    "    <failure message=\"expected status '{}', got '{}'\">{}</failure>\n",
                    escape(&outcome.expected_status),
                    escape(&outcome.actual_status),
                    escape(&detail.join("\n"))
                ));
                xml.push_str("  </testcase>\n");
            }
            CaseResult::Broken { name, message } => {
                xml.push_str(&format!(
                    "  <testcase name=\"{}\" classname=\"{}\" time=\"0.000\">\n",
                    escape(name),
                    escape(&case.suite)
                ));
                xml.push_str(&format!("    <error message=\"{}\"/>\n", escape(message)));
                xml.push_str("  </testcase>\n");
            }
        }
    }
    xml.push_str("</testsuite>\n");
    xml
}
