use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use crate::error::{Result, SdkError};

use super::pagination::{self, Page};
use super::{Branch, FetchQuery, PullRequest, PullRequestState, ScmFetcher};

const PAGE_SIZE: u32 = 100;

/// Fetcher for Bitbucket Server (self-hosted, `/rest/api/1.0`).
///
/// Responses embed the paging state: `isLastPage` plus the `nextPageStart`
/// offset of the following page.
pub struct BitbucketFetcher {
    http: reqwest::Client,
    base: Url,
    project: String,
    repo: String,
}

impl BitbucketFetcher {
    /// # Arguments
    ///
    /// * `base_url` - server root, e.g. `https://bitbucket.example.com`.
    /// * `project` - project key.
    /// * `repo` - repository slug.
    /// * `token` - bearer token, if the repository needs one.
    pub fn new(base_url: &str, project: &str, repo: &str, token: Option<&str>) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| SdkError::Config(format!("invalid Bitbucket URL '{base_url}': {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| SdkError::Config(format!("invalid Bitbucket token: {e}")))?;
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
            project: project.to_string(),
            repo: repo.to_string(),
        })
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        start: u64,
    ) -> Result<BitbucketPage<T>> {
        let mut url = self
            .base
            .join(&format!(
                "rest/api/1.0/projects/{}/repos/{}/{resource}",
                self.project, self.repo
            ))
            .map_err(|e| SdkError::Config(format!("invalid Bitbucket path: {e}")))?;
        url.query_pairs_mut()
            .append_pair("limit", &PAGE_SIZE.to_string())
            .append_pair("start", &start.to_string());

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

    async fn pull_page(&self, start: u64) -> Result<Page<PullRequest, u64>> {
        let page: BitbucketPage<BitbucketPull> =
            self.get_page("pull-requests?state=ALL", start).await?;
        Ok(Page {
            next: page.next(),
            items: page.values.into_iter().map(PullRequest::from).collect(),
        })
    }

    async fn branch_page(&self, start: u64) -> Result<Page<Branch, u64>> {
        let page: BitbucketPage<BitbucketBranch> = self.get_page("branches", start).await?;
        Ok(Page {
            next: page.next(),
            items: page.values.into_iter().map(Branch::from).collect(),
        })
    }
}

impl ScmFetcher for BitbucketFetcher {
    async fn fetch_pull_requests(&self, query: &FetchQuery) -> Result<Vec<PullRequest>> {
        let prs = pagination::collect(0, query.max_results, |start| self.pull_page(start)).await?;
        Ok(query.apply(prs))
    }

    async fn fetch_branches(&self, query: &FetchQuery) -> Result<Vec<Branch>> {
        pagination::collect(0, query.max_results, |start| self.branch_page(start)).await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitbucketPage<T> {
    values: Vec<T>,
    is_last_page: bool,
    #[serde(default)]
    next_page_start: Option<u64>,
}

impl<T> BitbucketPage<T> {
    fn next(&self) -> Option<u64> {
        if self.is_last_page {
            None
        } else {
            self.next_page_start
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitbucketPull {
    id: u64,
    title: String,
    state: String,
    from_ref: BitbucketRef,
    to_ref: BitbucketRef,
    author: Option<BitbucketParticipant>,
    updated_date: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitbucketRef {
    display_id: String,
}

#[derive(Deserialize)]
struct BitbucketParticipant {
    user: BitbucketUser,
}

#[derive(Deserialize)]
struct BitbucketUser {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitbucketBranch {
    display_id: String,
    #[serde(default)]
    latest_commit: Option<String>,
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

impl From<BitbucketPull> for PullRequest {
    fn from(raw: BitbucketPull) -> Self {
        let state = match raw.state.as_str() {
            "OPEN" => PullRequestState::Open,
            "MERGED" => PullRequestState::Merged,
            _ => PullRequestState::Closed,
        };
        PullRequest {
            id: raw.id.to_string(),
            title: raw.title,
            state,
            source_branch: raw.from_ref.display_id,
            target_branch: raw.to_ref.display_id,
            author: raw.author.map(|a| a.user.name),
            updated: raw.updated_date.and_then(millis_to_datetime),
            url: None,
        }
    }
}

impl From<BitbucketBranch> for Branch {
    fn from(raw: BitbucketBranch) -> Self {
        Branch {
            name: raw.display_id,
            head_sha: raw.latest_commit,
        }
    }
}
