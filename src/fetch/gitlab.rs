use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::error::{Result, SdkError};

use super::pagination::{self, Page};
use super::{Branch, FetchQuery, PullRequest, PullRequestState, ScmFetcher};

const PAGE_SIZE: u32 = 100;
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Fetcher for GitLab (gitlab.com or self-managed).
///
/// GitLab announces the next page number in a response header; an empty
/// header value means the last page.
pub struct GitlabFetcher {
    http: reqwest::Client,
    base: Url,
    project: String,
}

impl GitlabFetcher {
    /// # Arguments
    ///
    /// * `base_url` - server root, e.g. `https://gitlab.example.com`.
    /// * `project` - numeric project ID or URL-encoded `group%2Fproject` path.
    /// * `token` - private token, if the project needs one.
    pub fn new(base_url: &str, project: &str, token: Option<&str>) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| SdkError::Config(format!("invalid GitLab URL '{base_url}': {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| SdkError::Config(format!("invalid GitLab token: {e}")))?;
            headers.insert("PRIVATE-TOKEN", value);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("octane-ci-sdk/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| SdkError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            project: project.to_string(),
        })
    }

    /// Fetches one page and reads the next page number from the header.
    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        page: u32,
    ) -> Result<(Vec<T>, Option<u32>)> {
        let mut url = self
            .base
            .join(&format!("api/v4/projects/{}/{resource}", self.project))
            .map_err(|e| SdkError::Config(format!("invalid GitLab path: {e}")))?;
        url.query_pairs_mut()
            .append_pair("per_page", &PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string());

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let next = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());
        Ok((response.json().await?, next))
    }

    async fn merge_request_page(&self, page: u32) -> Result<Page<PullRequest, u32>> {
        let (raw, next): (Vec<GitlabMergeRequest>, _) =
            self.get_page("merge_requests?state=all", page).await?;
        Ok(Page {
            items: raw.into_iter().map(PullRequest::from).collect(),
            next,
        })
    }

    async fn branch_page(&self, page: u32) -> Result<Page<Branch, u32>> {
        let (raw, next): (Vec<GitlabBranch>, _) =
            self.get_page("repository/branches", page).await?;
        Ok(Page {
            items: raw.into_iter().map(Branch::from).collect(),
            next,
        })
    }
}

impl ScmFetcher for GitlabFetcher {
    async fn fetch_pull_requests(&self, query: &FetchQuery) -> Result<Vec<PullRequest>> {
        let prs =
            pagination::collect(1, query.max_results, |page| self.merge_request_page(page))
                .await?;
        Ok(query.apply(prs))
    }

    async fn fetch_branches(&self, query: &FetchQuery) -> Result<Vec<Branch>> {
        pagination::collect(1, query.max_results, |page| self.branch_page(page)).await
    }
}

#[derive(Deserialize)]
struct GitlabMergeRequest {
    iid: u64,
    title: String,
    state: String,
    source_branch: String,
    target_branch: String,
    updated_at: Option<DateTime<Utc>>,
    web_url: Option<String>,
    author: Option<GitlabUser>,
}

#[derive(Deserialize)]
struct GitlabUser {
    username: String,
}

#[derive(Deserialize)]
struct GitlabBranch {
    name: String,
    commit: Option<GitlabCommit>,
}

#[derive(Deserialize)]
struct GitlabCommit {
    id: String,
}

impl From<GitlabMergeRequest> for PullRequest {
    fn from(raw: GitlabMergeRequest) -> Self {
        let state = match raw.state.as_str() {
            "opened" | "locked" => PullRequestState::Open,
            "merged" => PullRequestState::Merged,
            _ => PullRequestState::Closed,
        };
        PullRequest {
            id: raw.iid.to_string(),
            title: raw.title,
            state,
            source_branch: raw.source_branch,
            target_branch: raw.target_branch,
            author: raw.author.map(|u| u.username),
            updated: raw.updated_at,
            url: raw.web_url,
        }
    }
}

impl From<GitlabBranch> for Branch {
    fn from(raw: GitlabBranch) -> Self {
        Branch {
            name: raw.name,
            head_sha: raw.commit.map(|c| c.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mr_json(iid: u64, state: &str) -> String {
        format!(
            r#"{{"iid":{iid},"title":"mr {iid}","state":"{state}",
"source_branch":"feature-{iid}","target_branch":"main",
"updated_at":"2026-07-01T12:00:00Z","web_url":"https://gitlab.example.com/mr/{iid}",
"author":{{"username":"dev"}}}}"#
        )
    }

    #[tokio::test]
    async fn test_next_page_header_followed() {
        let mut server = mockito::Server::new_async().await;
        let page1 = server
            .mock("GET", "/api/v4/projects/7/merge_requests")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("state".to_string(), "all".to_string()),
                mockito::Matcher::UrlEncoded("page".to_string(), "1".to_string()),
            ]))
            .with_status(200)
            .with_header("x-next-page", "2")
            .with_body(format!("[{}]", mr_json(1, "opened")))
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/api/v4/projects/7/merge_requests")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("page".to_string(), "2".to_string()),
            ]))
            .with_status(200)
            .with_header("x-next-page", "")
            .with_body(format!("[{}]", mr_json(2, "merged")))
            .create_async()
            .await;

        let fetcher = GitlabFetcher::new(&server.url(), "7", None).unwrap();
        let prs = fetcher
            .fetch_pull_requests(&FetchQuery::default())
            .await
            .unwrap();

        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].state, PullRequestState::Open);
        assert_eq!(prs[1].state, PullRequestState::Merged);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_branches_decode() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/7/repository/branches")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"name":"main","commit":{"id":"def456"}}]"#)
            .create_async()
            .await;

        let fetcher = GitlabFetcher::new(&server.url(), "7", None).unwrap();
        let branches = fetcher.fetch_branches(&FetchQuery::default()).await.unwrap();

        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].head_sha.as_deref(), Some("def456"));
    }
}
