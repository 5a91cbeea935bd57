// ABOUTME: SOAP envelopes for the metadata deploy calls.
// ABOUTME: Builds deploy/deployRecentValidation requests and extracts ids or faults.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::sync::LazyLock;

use crate::components::manifest_escape;
use crate::deploy::DeployOptions;
use crate::types::DeployId;

static ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:\w+:)?(?:id|result)>\s*([A-Za-z0-9]{15,18})\s*</(?:\w+:)?(?:id|result)>")
        .expect("valid regex")
});
static FAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<faultstring>(.*?)</faultstring>").expect("valid regex")
});

const METADATA_NS: &str = "http://soap.sforce.com/2006/04/metadata";

fn envelope(session_id: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:met="{METADATA_NS}">
  <soapenv:Header>
    <met:SessionHeader><met:sessionId>{}</met:sessionId></met:SessionHeader>
  </soapenv:Header>
  <soapenv:Body>
{body}
  </soapenv:Body>
</soapenv:Envelope>
"#,
        manifest_escape(session_id)
    )
}

/// `deploy` call carrying the base64 archive and options.
pub fn deploy_envelope(session_id: &str, archive: &[u8], options: &DeployOptions) -> String {
    let mut opts = format!(
        "      <met:DeployOptions>\n\
         \x20       <met:checkOnly>{}</met:checkOnly>\n\
         \x20       <met:ignoreWarnings>{}</met:ignoreWarnings>\n\
         \x20       <met:purgeOnDelete>{}</met:purgeOnDelete>\n\
         \x20       <met:rollbackOnError>{}</met:rollbackOnError>\n",
        options.check_only, options.ignore_warnings, options.purge_on_delete, options.rollback_on_error,
    );
    for test in &options.run_tests {
        opts.push_str(&format!(
            "        <met:runTests>{}</met:runTests>\n",
            manifest_escape(test)
        ));
    }
    opts.push_str(&format!(
        "        <met:singlePackage>{}</met:singlePackage>\n",
        options.single_package
    ));
    if let Some(level) = options.test_level {
        opts.push_str(&format!("        <met:testLevel>{level:?}</met:testLevel>\n"));
    }
    opts.push_str("      </met:DeployOptions>\n");

    let body = format!(
        "    <met:deploy>\n      <met:ZipFile>{}</met:ZipFile>\n{opts}    </met:deploy>",
        STANDARD.encode(archive)
    );
    envelope(session_id, &body)
}

/// `deployRecentValidation` call for a validated request.
pub fn replay_envelope(session_id: &str, validated_id: &DeployId) -> String {
    let body = format!(
        "    <met:deployRecentValidation>\n      <met:validationId>{validated_id}</met:validationId>\n    </met:deployRecentValidation>"
    );
    envelope(session_id, &body)
}

/// Extract the request id from a SOAP response, or the fault message.
pub fn parse_id(response: &str) -> Result<DeployId, String> {
    if let Some(fault) = FAULT.captures(response) {
        return Err(fault[1].trim().to_string());
    }
    let captured = ID
        .captures(response)
        .ok_or_else(|| "response does not contain a request id".to_string())?;
    DeployId::new(&captured[1]).map_err(|e| e.to_string())
}
