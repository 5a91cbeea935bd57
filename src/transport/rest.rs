// ABOUTME: REST implementation of the deploy transport over reqwest.
// ABOUTME: Multipart deploys, SOAP submission, status checks, and SourceMember queries.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use std::path::PathBuf;
use std::time::Duration;

use super::error::{DecodeSnafu, PackageSnafu, TransportError};
use super::{DeployTransport, RemoteMember, RemoteMemberSource, soap};
use crate::components::{ComponentKey, ComponentSet, build_archive};
use crate::deploy::{ApiProtocol, DeployOptions, DeployResult};
use crate::types::{ApiVersion, DeployId};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SOURCE_MEMBER_QUERY: &str =
    "SELECT MemberName, MemberType, RevisionCounter, IsNameObsolete FROM SourceMember";

/// Credentials and endpoint for one org.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgConnection {
    pub instance_url: String,
    pub access_token: String,
    pub username: Option<String>,
}

/// Deploy transport speaking the org's metadata REST API.
#[derive(Debug, Clone)]
pub struct RestTransport {
    client: Client,
    instance_url: String,
    access_token: String,
    api_version: ApiVersion,
    project_root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct DeployRequestResponse {
    id: DeployId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    deploy_result: DeployResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    records: Vec<SourceMemberRecord>,
    #[serde(default)]
    done: bool,
    next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceMemberRecord {
    member_name: String,
    member_type: String,
    revision_counter: u64,
    #[serde(default)]
    is_name_obsolete: bool,
}

impl RestTransport {
    pub fn new(
        connection: OrgConnection,
        api_version: ApiVersion,
        project_root: impl Into<PathBuf>,
    ) -> Result<Self, TransportError> {
        if connection.access_token.trim().is_empty() {
            return Err(TransportError::Connection {
                message: "access token is empty".to_string(),
            });
        }
        if !connection.instance_url.starts_with("https://")
            && !connection.instance_url.starts_with("http://")
        {
            return Err(TransportError::Connection {
                message: format!("instance url must be http(s): {}", connection.instance_url),
            });
        }

        let client = Client::builder()
            .user_agent(concat!("orgdeploy/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Connection {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            instance_url: connection.instance_url.trim_end_matches('/').to_string(),
            access_token: connection.access_token,
            api_version,
            project_root: project_root.into(),
        })
    }

    fn deploy_url(&self) -> String {
        format!(
            "{}/services/data/v{}/metadata/deployRequest",
            self.instance_url, self.api_version
        )
    }

    fn soap_url(&self) -> String {
        format!("{}/services/Soap/m/{}", self.instance_url, self.api_version)
    }

    fn query_url(&self) -> String {
        format!(
            "{}/services/data/v{}/tooling/query?q={}",
            self.instance_url,
            self.api_version,
            urlencoding::encode(SOURCE_MEMBER_QUERY)
        )
    }

    /// Send a request, mapping gateway timeouts to the timeout variant.
    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 408 || status.as_u16() == 504 {
            return Err(TransportError::Timeout {
                url: url.to_string(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        url: &str,
        response: Response,
    ) -> Result<T, TransportError> {
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        serde_json::from_str(&text).context(DecodeSnafu { url })
    }

    async fn soap_call(&self, action: &str, envelope: String) -> Result<DeployId, TransportError> {
        let url = self.soap_url();
        let request = self
            .client
            .post(&url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", action)
            .body(envelope);

        // Faults arrive as HTTP 500 with a SOAP body.
        let text = match self.send(&url, request).await {
            Ok(response) => response
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(&url, e))?,
            Err(TransportError::Status { body, .. }) => body,
            Err(e) => return Err(e),
        };

        soap::parse_id(&text).map_err(|message| TransportError::Protocol { url, message })
    }
}

#[async_trait]
impl DeployTransport for RestTransport {
    async fn deploy(
        &self,
        components: &ComponentSet,
        options: &DeployOptions,
    ) -> Result<DeployId, TransportError> {
        let archive = build_archive(components, &self.project_root).context(PackageSnafu)?;
        tracing::debug!(bytes = archive.len(), protocol = %options.protocol, "packaged components");

        if options.protocol == ApiProtocol::Soap {
            let envelope = soap::deploy_envelope(&self.access_token, &archive, options);
            return self.soap_call("deploy", envelope).await;
        }

        let url = self.deploy_url();
        let json = serde_json::json!({ "deployOptions": options }).to_string();
        let part_err = |e| TransportError::from_reqwest(&url, e);
        let form = Form::new()
            .part(
                "json",
                Part::text(json)
                    .mime_str("application/json")
                    .map_err(part_err)?,
            )
            .part(
                "file",
                Part::bytes(archive)
                    .file_name("deploy.zip")
                    .mime_str("application/zip")
                    .map_err(part_err)?,
            );

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .multipart(form);
        let response = self.send(&url, request).await?;
        let body: DeployRequestResponse = self.json(&url, response).await?;
        Ok(body.id)
    }

    async fn deploy_recent_validation(
        &self,
        validated_id: &DeployId,
        options: &DeployOptions,
    ) -> Result<DeployId, TransportError> {
        if options.protocol == ApiProtocol::Soap {
            let envelope = soap::replay_envelope(&self.access_token, validated_id);
            return self.soap_call("deployRecentValidation", envelope).await;
        }

        let url = format!("{}/{}", self.deploy_url(), validated_id);
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "validatedDeployRequestId": validated_id }));
        let response = self.send(&url, request).await?;
        let body: DeployRequestResponse = self.json(&url, response).await?;
        Ok(body.id)
    }

    async fn check_status(&self, id: &DeployId) -> Result<DeployResult, TransportError> {
        let url = format!("{}/{}?includeDetails=true", self.deploy_url(), id);
        let request = self.client.get(&url).bearer_auth(&self.access_token);
        let response = self.send(&url, request).await?;
        let body: StatusResponse = self.json(&url, response).await?;
        Ok(body.deploy_result)
    }
}

#[async_trait]
impl RemoteMemberSource for RestTransport {
    async fn source_members(&self) -> Result<Vec<RemoteMember>, TransportError> {
        let mut members = Vec::new();
        let mut url = self.query_url();

        loop {
            let request = self.client.get(&url).bearer_auth(&self.access_token);
            let response = self.send(&url, request).await?;
            let page: QueryPage = self.json(&url, response).await?;

            members.extend(page.records.into_iter().map(|r| RemoteMember {
                key: ComponentKey::new(r.member_type, r.member_name),
                revision: r.revision_counter,
                deleted: r.is_name_obsolete,
            }));

            match page.next_records_url {
                Some(next) if !page.done => url = format!("{}{}", self.instance_url, next),
                _ => break,
            }
        }

        tracing::debug!(count = members.len(), "fetched remote source members");
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> OrgConnection {
        OrgConnection {
            instance_url: "https://example.my.salesforce.com/".to_string(),
            access_token: "token".to_string(),
            username: None,
        }
    }

    #[test]
    fn builds_versioned_endpoints() {
        let transport = RestTransport::new(connection(), ApiVersion::new(61), ".").unwrap();
        assert_eq!(
            transport.deploy_url(),
            "https://example.my.salesforce.com/services/data/v61.0/metadata/deployRequest"
        );
        assert_eq!(
            transport.soap_url(),
            "https://example.my.salesforce.com/services/Soap/m/61.0"
        );
        assert!(transport.query_url().contains("q=SELECT%20MemberName"));
    }

    #[test]
    fn rejects_unusable_connections() {
        let err = RestTransport::new(
            OrgConnection {
                access_token: "  ".to_string(),
                ..connection()
            },
            ApiVersion::default(),
            ".",
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::Connection { .. }));

        let err = RestTransport::new(
            OrgConnection {
                instance_url: "example.com".to_string(),
                ..connection()
            },
            ApiVersion::default(),
            ".",
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::Connection { .. }));
    }

    #[test]
    fn decodes_status_and_query_payloads() {
        let status: StatusResponse = serde_json::from_str(
            r#"{"id":"0Af000000000001","deployResult":{"id":"0Af000000000001","status":"InProgress","numberComponentsTotal":3}}"#,
        )
        .unwrap();
        assert_eq!(status.deploy_result.number_components_total, 3);

        let page: QueryPage = serde_json::from_str(
            r#"{"done":true,"records":[{"MemberName":"Foo","MemberType":"ApexClass","RevisionCounter":4,"IsNameObsolete":false}]}"#,
        )
        .unwrap();
        assert_eq!(page.records[0].revision_counter, 4);
        assert!(page.next_records_url.is_none());
    }
}
