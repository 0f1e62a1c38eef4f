use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use crate::error::{Result, SdkError};

use super::pagination::{self, Page};
use super::{Branch, FetchQuery, PullRequest, PullRequestState, ScmFetcher};

const PAGE_SIZE: u32 = 100;

/// Fetcher for GitHub (github.com or GitHub Enterprise).
///
/// GitHub paginates by page number; a page shorter than the requested size is
/// the last one.
pub struct GithubFetcher {
    http: reqwest::Client,
    base: Url,
    repo: String,
}

impl GithubFetcher {
    /// # Arguments
    ///
    /// * `api_base` - API root, e.g. `https://api.github.com` or
    ///   `https://ghe.example.com/api/v3`.
    /// * `repo` - `owner/name` slug.
    /// * `token` - personal access token, if the repository needs one.
    pub fn new(api_base: &str, repo: &str, token: Option<&str>) -> Result<Self> {
        let mut base = Url::parse(api_base)
            .map_err(|e| SdkError::Config(format!("invalid GitHub API URL '{api_base}': {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| SdkError::Config(format!("invalid GitHub token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("octane-ci-sdk/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| SdkError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            repo: repo.to_string(),
        })
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        page: u32,
    ) -> Result<Vec<T>> {
        let mut url = self
            .base
            .join(&format!("repos/{}/{resource}", self.repo))
            .map_err(|e| SdkError::Config(format!("invalid GitHub path: {e}")))?;
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
        Ok(response.json().await?)
    }

    async fn pull_page(&self, page: u32) -> Result<Page<PullRequest, u32>> {
        let raw: Vec<GithubPull> = self.get_page("pulls?state=all", page).await?;
        let next = (raw.len() as u32 == PAGE_SIZE).then_some(page + 1);
        Ok(Page {
            items: raw.into_iter().map(PullRequest::from).collect(),
            next,
        })
    }

    async fn branch_page(&self, page: u32) -> Result<Page<Branch, u32>> {
        let raw: Vec<GithubBranch> = self.get_page("branches", page).await?;
        let next = (raw.len() as u32 == PAGE_SIZE).then_some(page + 1);
        Ok(Page {
            items: raw.into_iter().map(Branch::from).collect(),
            next,
        })
    }
}

impl ScmFetcher for GithubFetcher {
    async fn fetch_pull_requests(&self, query: &FetchQuery) -> Result<Vec<PullRequest>> {
        let prs = pagination::collect(1, query.max_results, |page| self.pull_page(page)).await?;
        Ok(query.apply(prs))
    }

    async fn fetch_branches(&self, query: &FetchQuery) -> Result<Vec<Branch>> {
        pagination::collect(1, query.max_results, |page| self.branch_page(page)).await
    }
}

#[derive(Deserialize)]
struct GithubPull {
    number: u64,
    title: String,
    state: String,
    merged_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    html_url: Option<String>,
    head: GithubRef,
    base: GithubRef,
    user: Option<GithubUser>,
}

#[derive(Deserialize)]
struct GithubRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Deserialize)]
struct GithubUser {
    login: String,
}

#[derive(Deserialize)]
struct GithubBranch {
    name: String,
    commit: Option<GithubCommit>,
}

#[derive(Deserialize)]
struct GithubCommit {
    sha: String,
}

impl From<GithubPull> for PullRequest {
    fn from(raw: GithubPull) -> Self {
        let state = if raw.state == "open" {
            PullRequestState::Open
        } else if raw.merged_at.is_some() {
            PullRequestState::Merged
        } else {
            PullRequestState::Closed
        };
        PullRequest {
            id: raw.number.to_string(),
            title: raw.title,
            state,
            source_branch: raw.head.name,
            target_branch: raw.base.name,
            author: raw.user.map(|u| u.login),
            updated: raw.updated_at,
            url: raw.html_url,
        }
    }
}

impl From<GithubBranch> for Branch {
    fn from(raw: GithubBranch) -> Self {
        Branch {
            name: raw.name,
            head_sha: raw.commit.map(|c| c.sha),
        }
    }
}
