use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::error::{GithubDaoError, GithubResult};

const BASE64_ENCODING: &str = "base64";

/// Payload of `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Deserialize)]
pub struct ContentsResponse {
    pub sha: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentsResponse {
    /// Decode the file body, which the API wraps at 60 columns.
    pub fn decoded(&self, path: &str) -> GithubResult<Vec<u8>> {
        match self.encoding.as_deref() {
            None | Some(BASE64_ENCODING) => {}
            Some(other) => {
                return Err(GithubDaoError::UnsupportedEncoding {
                    path: path.to_string(),
                    encoding: other.to_string(),
                });
            }
        }

        let compact: String = self
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD
            .decode(compact)
            .map_err(|source| GithubDaoError::DecodeContent {
                path: path.to_string(),
                source,
            })
    }
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Serialize)]
pub struct PutContentsRequest<'a> {
    pub message: &'a str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<&'a str>,
}

impl<'a> PutContentsRequest<'a> {
    pub fn new(
        message: &'a str,
        body: &str,
        sha: Option<&'a str>,
        branch: Option<&'a str>,
    ) -> Self {
        Self {
            message,
            content: STANDARD.encode(body),
            sha,
            branch,
        }
    }
}

/// Payload returned by a successful content update.
#[derive(Debug, Deserialize)]
pub struct PutContentsResponse {
    pub content: CommittedContent,
}

#[derive(Debug, Deserialize)]
pub struct CommittedContent {
    pub sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_base64_content_is_decoded() {
        let response = ContentsResponse {
            sha: "abc".into(),
            content: "eyJnYW1l\ncyI6W119\n".into(),
            encoding: Some("base64".into()),
        };
        assert_eq!(response.decoded("games.json").unwrap(), br#"{"games":[]}"#);
    }

    #[test]
    fn foreign_encoding_is_rejected() {
        let response = ContentsResponse {
            sha: "abc".into(),
            content: String::new(),
            encoding: Some("none".into()),
        };
        assert!(matches!(
            response.decoded("games.json"),
            Err(GithubDaoError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn create_request_omits_sha() {
        let request = PutContentsRequest::new("Add game", "{}", None, None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["content"], "e30=");
        assert!(json.get("sha").is_none());
        assert!(json.get("branch").is_none());
    }
}
