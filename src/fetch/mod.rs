//! Pull-request and branch fetchers for third-party SCM servers.
//!
//! Each vendor module implements [`ScmFetcher`] over its own REST API and
//! converts the vendor payloads into the internal [`PullRequest`] and
//! [`Branch`] shapes. Pagination loops are shared via [`pagination::collect`];
//! only the page-link extraction differs per vendor.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod bitbucket;
pub mod github;
pub mod gitlab;
pub mod pagination;

pub use bitbucket::BitbucketFetcher;
pub use github::GithubFetcher;
pub use gitlab::GitlabFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Merged,
    Closed,
}

/// Vendor-neutral pull request record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub state: PullRequestState,
    pub source_branch: String,
    pub target_branch: String,
    pub author: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

/// Vendor-neutral branch record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub head_sha: Option<String>,
}

/// Bounds and filters for one fetch call.
#[derive(Debug, Clone)]
pub struct FetchQuery {
    /// Upper bound on records fetched from the vendor across all pages.
    ///
    /// The cap applies before the client-side filters below, so a filtered
    /// fetch can return fewer matches even when later pages hold more.
    pub max_results: usize,
    /// Keep only pull requests updated at or after this instant.
    pub updated_after: Option<DateTime<Utc>>,
    /// Keep only pull requests targeting this branch.
    pub destination_branch: Option<String>,
}

impl Default for FetchQuery {
    fn default() -> Self {
        Self {
            max_results: 100,
            updated_after: None,
            destination_branch: None,
        }
    }
}

impl FetchQuery {
    /// Client-side filter for vendors whose API cannot express the query.
    fn matches(&self, pr: &PullRequest) -> bool {
        if let Some(after) = self.updated_after {
            match pr.updated {
                Some(updated) if updated >= after => {}
                _ => return false,
            }
        }
        if let Some(branch) = &self.destination_branch {
            if &pr.target_branch != branch {
                return false;
            }
        }
        true
    }

    fn apply(&self, prs: Vec<PullRequest>) -> Vec<PullRequest> {
        prs.into_iter()
            .filter(|pr| self.matches(pr))
            .take(self.max_results)
            .collect()
    }
}

/// One SCM vendor's fetch surface.
pub trait ScmFetcher: Send + Sync {
    fn fetch_pull_requests(
        &self,
        query: &FetchQuery,
    ) -> impl Future<Output = Result<Vec<PullRequest>>> + Send;

    fn fetch_branches(&self, query: &FetchQuery) -> impl Future<Output = Result<Vec<Branch>>> + Send;
}

/// Fetches pull requests and branches concurrently from one vendor.
pub async fn fetch_snapshot<F: ScmFetcher>(
    fetcher: &F,
    query: &FetchQuery,
) -> Result<(Vec<PullRequest>, Vec<Branch>)> {
    futures::try_join!(
        fetcher.fetch_pull_requests(query),
        fetcher.fetch_branches(query)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pr(target: &str, updated: DateTime<Utc>) -> PullRequest {
        PullRequest {
            id: "1".to_string(),
            title: "change".to_string(),
            state: PullRequestState::Open,
            source_branch: "feature".to_string(),
            target_branch: target.to_string(),
            author: None,
            updated: Some(updated),
            url: None,
        }
    }

    #[test]
    fn test_updated_after_filter() {
        let cutoff = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let query = FetchQuery {
            updated_after: Some(cutoff),
            ..FetchQuery::default()
        };

        let kept = query.apply(vec![pr("main", old), pr("main", cutoff)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].updated, Some(cutoff));
    }

    struct StubFetcher;

    impl ScmFetcher for StubFetcher {
        async fn fetch_pull_requests(&self, _query: &FetchQuery) -> Result<Vec<PullRequest>> {
            Ok(vec![pr("main", Utc::now())])
        }

        async fn fetch_branches(&self, _query: &FetchQuery) -> Result<Vec<Branch>> {
            Ok(vec![Branch {
                name: "main".to_string(),
                head_sha: None,
            }])
        }
    }

    #[tokio::test]
    async fn test_fetch_snapshot_returns_both() {
        let (prs, branches) = fetch_snapshot(&StubFetcher, &FetchQuery::default())
            .await
            .unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(branches[0].name, "main");
    }

    #[test]
    fn test_destination_branch_filter_and_cap() {
        let now = Utc::now();
        let query = FetchQuery {
            max_results: 1,
            destination_branch: Some("main".to_string()),
            ..FetchQuery::default()
        };

        let kept = query.apply(vec![pr("dev", now), pr("main", now), pr("main", now)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].target_branch, "main");
    }
}
