use crate::core::error::{Error, ProviderKind, Result};
use crate::core::listing::{ListingOrder, Post};
use crate::core::provider::DiscussionProvider;
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Largest page the listing endpoints return.
const PAGE_SIZE: usize = 100;

fn provider_error(e: impl Into<anyhow::Error>) -> Error {
    Error::provider(ProviderKind::Discussion, e)
}

/// Reads subreddit listings with an application-only OAuth token.
pub struct RedditProvider {
    auth_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
    token: OnceCell<String>,
}

impl RedditProvider {
    pub fn new(
        auth_url: &str,
        api_url: &str,
        client_id: &str,
        client_secret: &str,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(provider_error)?;
        Ok(RedditProvider {
            auth_url: auth_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            client,
            token: OnceCell::new(),
        })
    }

    async fn access_token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| self.request_token())
            .await?;
        Ok(token.as_str())
    }

    async fn request_token(&self) -> Result<String> {
        let url = format!("{}/api/v1/access_token", self.auth_url);
        debug!("Requesting access token from {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| provider_error(anyhow!("Token request error: {}", e)))?;

        if !response.status().is_success() {
            return Err(provider_error(anyhow!(
                "HTTP error: {} while authenticating",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| provider_error(anyhow!("Failed to parse token response: {}", e)))?;

        match (token.access_token, token.error) {
            (Some(access_token), _) => Ok(access_token),
            (None, error) => Err(provider_error(anyhow!(
                "Authentication failed: {}",
                error.unwrap_or_else(|| "no access token returned".to_string())
            ))),
        }
    }

    async fn fetch_page(
        &self,
        forum: &str,
        order: ListingOrder,
        limit: usize,
        after: Option<&str>,
    ) -> Result<ListingData> {
        let token = self.access_token().await?;
        let endpoint = format!("{}/r/{}/{}", self.api_url, forum, order);

        let mut params = vec![
            ("limit", limit.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(after) = after {
            params.push(("after", after.to_string()));
        }
        let url = reqwest::Url::parse_with_params(&endpoint, &params).map_err(provider_error)?;
        debug!("Requesting listing page from {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| provider_error(anyhow!("Request error: {} for r/{}", e, forum)))?;

        if !response.status().is_success() {
            return Err(provider_error(anyhow!(
                "HTTP error: {} for r/{}",
                response.status(),
                forum
            )));
        }

        let text = response.text().await.map_err(provider_error)?;
        let listing: ListingResponse = serde_json::from_str(&text).map_err(|e| {
            provider_error(anyhow!("Failed to parse listing for r/{}: {}", forum, e))
        })?;
        Ok(listing.data)
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ListingResponse {
    data: ListingData,
}

#[derive(Deserialize, Debug)]
struct ListingData {
    after: Option<String>,
    children: Vec<Thing>,
}

#[derive(Deserialize, Debug)]
struct Thing {
    data: Submission,
}

#[derive(Deserialize, Debug)]
struct Submission {
    title: String,
    author: Option<String>,
    #[serde(default)]
    num_comments: u64,
    url: String,
}

impl From<Submission> for Post {
    fn from(s: Submission) -> Self {
        // Deleted accounts are reported by name, treat them as absent.
        let author = s.author.filter(|a| a != "[deleted]");
        Post {
            title: s.title,
            author,
            num_comments: s.num_comments,
            url: s.url,
        }
    }
}

#[async_trait]
impl DiscussionProvider for RedditProvider {
    #[instrument(
        name = "RedditListingFetch",
        skip(self),
        fields(forum = %forum, order = %order)
    )]
    async fn posts(&self, forum: &str, order: ListingOrder, limit: usize) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = Vec::with_capacity(limit.min(PAGE_SIZE));
        let mut after: Option<String> = None;

        while posts.len() < limit {
            let page_size = (limit - posts.len()).min(PAGE_SIZE);
            let page = self
                .fetch_page(forum, order, page_size, after.as_deref())
                .await?;
            let received = page.children.len();

            posts.extend(
                page.children
                    .into_iter()
                    .take(limit - posts.len())
                    .map(|thing| Post::from(thing.data)),
            );
            debug!(received, total = posts.len(), "Fetched listing page");

            after = page.after;
            if after.is_none() || received == 0 {
                break;
            }
        }

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn submission(i: usize) -> String {
        format!(
            r#"{{"kind": "t3", "data": {{"title": "Post {i}", "author": "user{i}", "num_comments": {i}, "url": "https://www.reddit.com/r/wallstreetbets/comments/{i}/"}}}}"#
        )
    }

    fn listing_body(range: std::ops::Range<usize>, after: Option<&str>) -> String {
        let children: Vec<String> = range.map(submission).collect();
        let after = after.map_or("null".to_string(), |a| format!("\"{a}\""));
        format!(
            r#"{{"kind": "Listing", "data": {{"after": {after}, "children": [{}]}}}}"#,
            children.join(",")
        )
    }

    async fn mount_token(mock_server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .and(header("authorization", "Basic aWQ6c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token": "tok", "token_type": "bearer", "expires_in": 86400}"#,
            ))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    fn provider(mock_server: &MockServer) -> RedditProvider {
        RedditProvider::new(
            &mock_server.uri(),
            &mock_server.uri(),
            "id",
            "secret",
            "my-wsb-tracker by/u/tester",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_hot_posts_with_limit() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        let body = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_next",
                "children": [
                    {"kind": "t3", "data": {"title": "GME YOLO", "author": "DeepFuckingValue", "num_comments": 1200, "url": "https://i.redd.it/yolo.png"}},
                    {"kind": "t3", "data": {"title": "Daily thread", "author": "[deleted]", "num_comments": 50000, "url": "https://www.reddit.com/r/wallstreetbets/comments/abc/"}},
                    {"kind": "t3", "data": {"title": "Loss porn", "author": null, "num_comments": 3, "url": "https://i.redd.it/loss.png"}}
                ]
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/r/wallstreetbets/hot"))
            .and(query_param("limit", "3"))
            .and(header("authorization", "Bearer tok"))
            .and(header("user-agent", "my-wsb-tracker by/u/tester"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let posts = provider(&mock_server)
            .posts("wallstreetbets", ListingOrder::Hot, 3)
            .await
            .unwrap();

        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].title, "GME YOLO");
        assert_eq!(posts[0].author.as_deref(), Some("DeepFuckingValue"));
        assert_eq!(posts[0].num_comments, 1200);
        assert_eq!(posts[1].author, None);
        assert_eq!(posts[2].author, None);
        assert_eq!(posts[2].url, "https://i.redd.it/loss.png");
    }

    #[tokio::test]
    async fn test_pagination_follows_after_cursor() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/r/wallstreetbets/new"))
            .and(query_param("limit", "100"))
            .and(query_param_is_missing("after"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(listing_body(0..100, Some("t3_p2"))),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/wallstreetbets/new"))
            .and(query_param("limit", "20"))
            .and(query_param("after", "t3_p2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(listing_body(100..120, Some("t3_p3"))),
            )
            .mount(&mock_server)
            .await;

        let posts = provider(&mock_server)
            .posts("wallstreetbets", ListingOrder::New, 120)
            .await
            .unwrap();

        assert_eq!(posts.len(), 120);
        assert_eq!(posts[0].title, "Post 0");
        assert_eq!(posts[119].title, "Post 119");
    }

    #[tokio::test]
    async fn test_listing_shorter_than_limit() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/r/stocks/rising"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(0..2, None)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let posts = provider(&mock_server)
            .posts("stocks", ListingOrder::Rising, 25)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_authentication_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server)
            .posts("wallstreetbets", ListingOrder::Hot, 5)
            .await
            .unwrap_err();
        assert_eq!(err.provider_kind(), Some(ProviderKind::Discussion));
        assert_eq!(
            err.to_string(),
            "Reddit request failed: HTTP error: 401 Unauthorized while authenticating"
        );
    }

    #[tokio::test]
    async fn test_invalid_grant() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"error": "invalid_grant"}"#),
            )
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server)
            .posts("wallstreetbets", ListingOrder::Hot, 5)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reddit request failed: Authentication failed: invalid_grant"
        );
    }

    #[tokio::test]
    async fn test_rate_limited_listing() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;
        Mock::given(method("GET"))
            .and(path("/r/wallstreetbets/hot"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server)
            .posts("wallstreetbets", ListingOrder::Hot, 5)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reddit request failed: HTTP error: 429 Too Many Requests for r/wallstreetbets"
        );
    }

    #[tokio::test]
    async fn test_zero_limit_makes_no_request() {
        let mock_server = MockServer::start().await;
        let posts = provider(&mock_server)
            .posts("wallstreetbets", ListingOrder::Hot, 0)
            .await
            .unwrap();
        assert!(posts.is_empty());
    }
}
