//! PostgREST tables and the listing RPC.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};

use forum_core::domain::{
    Comment, Like, NewComment, NewPost, Post, PostId, PostSummary, PostUpdate,
};
use forum_core::error::GatewayError;
use forum_core::ports::ForumGateway;

use super::SupabaseClient;

const POSTS_WITH_COUNTS: &str = "rpc/get_posts_with_counts";
const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";
const PREFER: &str = "Prefer";

/// Take the single row of an insert response.
fn single<T>(rows: Vec<T>, table: &str) -> Result<T, GatewayError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::Decode(format!("insert into {table} returned no row")))
}

/// Request builders, one per gateway call.
impl SupabaseClient {
    async fn posts_with_counts_request(&self) -> RequestBuilder {
        self.request(Method::POST, self.config.rest_url(POSTS_WITH_COUNTS))
            .await
            .json(&serde_json::json!({}))
    }

    async fn post_request(&self, id: PostId) -> RequestBuilder {
        self.request(Method::GET, self.config.rest_url("posts"))
            .await
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())])
    }

    async fn insert_post_request(&self, post: &NewPost) -> RequestBuilder {
        self.request(Method::POST, self.config.rest_url("posts"))
            .await
            .header(PREFER, RETURN_REPRESENTATION)
            .json(post)
    }

    async fn update_post_request(&self, id: PostId, update: &PostUpdate) -> RequestBuilder {
        self.request(Method::PATCH, self.config.rest_url("posts"))
            .await
            .query(&[("id", format!("eq.{id}"))])
            .header(PREFER, RETURN_REPRESENTATION)
            .json(update)
    }

    async fn delete_post_request(&self, id: PostId) -> RequestBuilder {
        self.request(Method::DELETE, self.config.rest_url("posts"))
            .await
            .query(&[("id", format!("eq.{id}"))])
            .header(PREFER, RETURN_REPRESENTATION)
    }

    async fn comments_request(&self, post_id: PostId) -> RequestBuilder {
        self.request(Method::GET, self.config.rest_url("comments"))
            .await
            .query(&[
                ("post_id", format!("eq.{post_id}")),
                ("select", "*".to_string()),
                ("order", "created_at.asc".to_string()),
            ])
    }

    async fn insert_comment_request(&self, comment: &NewComment) -> RequestBuilder {
        self.request(Method::POST, self.config.rest_url("comments"))
            .await
            .header(PREFER, RETURN_REPRESENTATION)
            .json(comment)
    }

    async fn likes_request(&self, post_id: PostId) -> RequestBuilder {
        self.request(Method::GET, self.config.rest_url("likes"))
            .await
            .query(&[
                ("post_id", format!("eq.{post_id}")),
                ("select", "post_id,user_id".to_string()),
            ])
    }

    async fn insert_like_request(&self, like: &Like) -> RequestBuilder {
        self.request(Method::POST, self.config.rest_url("likes"))
            .await
            .header(PREFER, RETURN_MINIMAL)
            .json(like)
    }

    async fn delete_like_request(&self, like: &Like) -> RequestBuilder {
        self.request(Method::DELETE, self.config.rest_url("likes"))
            .await
            .query(&[
                ("post_id", format!("eq.{}", like.post_id)),
                ("user_id", format!("eq.{}", like.user_id)),
            ])
            .header(PREFER, RETURN_REPRESENTATION)
    }
}

#[async_trait]
impl ForumGateway for SupabaseClient {
    #[tracing::instrument(skip(self))]
    async fn posts_with_counts(&self) -> Result<Vec<PostSummary>, GatewayError> {
        Self::send_json(self.posts_with_counts_request().await).await
    }

    #[tracing::instrument(skip(self))]
    async fn post(&self, id: PostId) -> Result<Option<Post>, GatewayError> {
        let rows: Vec<Post> = Self::send_json(self.post_request(id).await).await?;
        Ok(rows.into_iter().next())
    }

    #[tracing::instrument(skip(self, post), fields(title = %post.title))]
    async fn insert_post(&self, post: &NewPost) -> Result<Post, GatewayError> {
        let rows = Self::send_json(self.insert_post_request(post).await).await?;
        single(rows, "posts")
    }

    #[tracing::instrument(skip(self, update))]
    async fn update_post(
        &self,
        id: PostId,
        update: &PostUpdate,
    ) -> Result<Vec<Post>, GatewayError> {
        Self::send_json(self.update_post_request(id, update).await).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_post(&self, id: PostId) -> Result<Vec<Post>, GatewayError> {
        Self::send_json(self.delete_post_request(id).await).await
    }

    #[tracing::instrument(skip(self))]
    async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>, GatewayError> {
        Self::send_json(self.comments_request(post_id).await).await
    }

    #[tracing::instrument(skip(self, comment), fields(post_id = %comment.post_id))]
    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, GatewayError> {
        let rows = Self::send_json(self.insert_comment_request(comment).await).await?;
        single(rows, "comments")
    }

    #[tracing::instrument(skip(self))]
    async fn likes(&self, post_id: PostId) -> Result<Vec<Like>, GatewayError> {
        Self::send_json(self.likes_request(post_id).await).await
    }

    #[tracing::instrument(skip(self))]
    async fn insert_like(&self, like: &Like) -> Result<(), GatewayError> {
        Self::send_empty(self.insert_like_request(like).await).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_like(&self, like: &Like) -> Result<Vec<Like>, GatewayError> {
        Self::send_json(self.delete_like_request(like).await).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryLocalStorage;
    use crate::supabase::tests::client_with;
    use forum_core::domain::{CommentId, UserId};
    use reqwest::Request;
    use uuid::Uuid;

    const REST: &str = "https://demo.supabase.co/rest/v1";

    fn query(request: &Request) -> Vec<(String, String)> {
        request.url().query_pairs().into_owned().collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn prefer(request: &Request) -> Option<&str> {
        request.headers().get(PREFER).and_then(|v| v.to_str().ok())
    }

    fn body(request: &Request) -> serde_json::Value {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    fn path(request: &Request) -> String {
        format!("{}{}", request.url().origin().ascii_serialization(), request.url().path())
    }

    fn like() -> Like {
        Like {
            post_id: PostId(7),
            user_id: UserId(Uuid::nil()),
        }
    }

    #[tokio::test]
    async fn listing_is_an_rpc_with_empty_body() {
        let client = client_with(InMemoryLocalStorage::new());
        let request = client.posts_with_counts_request().await.build().unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(path(&request), format!("{REST}/rpc/get_posts_with_counts"));
        assert_eq!(body(&request), serde_json::json!({}));
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer anon-key"
        );
    }

    #[tokio::test]
    async fn reads_filter_by_id() {
        let client = client_with(InMemoryLocalStorage::new());

        let request = client.post_request(PostId(7)).await.build().unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(path(&request), format!("{REST}/posts"));
        assert_eq!(query(&request), pairs(&[("id", "eq.7"), ("select", "*")]));

        let request = client.comments_request(PostId(7)).await.build().unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(path(&request), format!("{REST}/comments"));
        assert_eq!(
            query(&request),
            pairs(&[("post_id", "eq.7"), ("select", "*"), ("order", "created_at.asc")])
        );

        let request = client.likes_request(PostId(7)).await.build().unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(path(&request), format!("{REST}/likes"));
        assert_eq!(
            query(&request),
            pairs(&[("post_id", "eq.7"), ("select", "post_id,user_id")])
        );
    }

    #[tokio::test]
    async fn post_writes_return_the_affected_rows() {
        let client = client_with(InMemoryLocalStorage::new());
        let author = UserId(Uuid::nil());

        let request = client
            .insert_post_request(&NewPost {
                title: "Hello".to_string(),
                content: "body".to_string(),
                image_url: None,
                avatar_url: None,
                user_id: author,
            })
            .await
            .build()
            .unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(path(&request), format!("{REST}/posts"));
        assert_eq!(prefer(&request), Some(RETURN_REPRESENTATION));
        assert_eq!(body(&request)["title"], "Hello");
        assert!(body(&request).get("image_url").is_none());

        let request = client
            .update_post_request(
                PostId(7),
                &PostUpdate {
                    title: "Renamed".to_string(),
                    content: "edited".to_string(),
                },
            )
            .await
            .build()
            .unwrap();
        assert_eq!(request.method(), &Method::PATCH);
        assert_eq!(path(&request), format!("{REST}/posts"));
        assert_eq!(query(&request), pairs(&[("id", "eq.7")]));
        assert_eq!(prefer(&request), Some(RETURN_REPRESENTATION));
        assert_eq!(
            body(&request),
            serde_json::json!({"title": "Renamed", "content": "edited"})
        );

        let request = client.delete_post_request(PostId(7)).await.build().unwrap();
        assert_eq!(request.method(), &Method::DELETE);
        assert_eq!(path(&request), format!("{REST}/posts"));
        assert_eq!(query(&request), pairs(&[("id", "eq.7")]));
        assert_eq!(prefer(&request), Some(RETURN_REPRESENTATION));
    }

    #[tokio::test]
    async fn comment_insert_returns_the_row() {
        let client = client_with(InMemoryLocalStorage::new());
        let request = client
            .insert_comment_request(&NewComment {
                post_id: PostId(7),
                content: "agreed".to_string(),
                parent_comment_id: Some(CommentId(3)),
                user_id: UserId(Uuid::nil()),
                author: "grace".to_string(),
            })
            .await
            .build()
            .unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(path(&request), format!("{REST}/comments"));
        assert_eq!(prefer(&request), Some(RETURN_REPRESENTATION));
        assert_eq!(body(&request)["parent_comment_id"], 3);
        assert_eq!(body(&request)["post_id"], 7);
    }

    #[tokio::test]
    async fn like_insert_is_minimal_and_delete_filters_both_keys() {
        let client = client_with(InMemoryLocalStorage::new());

        let request = client.insert_like_request(&like()).await.build().unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(path(&request), format!("{REST}/likes"));
        assert_eq!(prefer(&request), Some(RETURN_MINIMAL));
        assert_eq!(
            body(&request),
            serde_json::json!({"post_id": 7, "user_id": Uuid::nil()})
        );

        let request = client.delete_like_request(&like()).await.build().unwrap();
        let user = format!("eq.{}", Uuid::nil());
        assert_eq!(request.method(), &Method::DELETE);
        assert_eq!(path(&request), format!("{REST}/likes"));
        assert_eq!(
            query(&request),
            pairs(&[("post_id", "eq.7"), ("user_id", user.as_str())])
        );
        assert_eq!(prefer(&request), Some(RETURN_REPRESENTATION));
    }

    #[test]
    fn single_takes_first_row() {
        assert_eq!(single(vec![1, 2], "posts").unwrap(), 1);
    }

    #[test]
    fn single_rejects_empty_insert_response() {
        let err = single::<i32>(Vec::new(), "comments").unwrap_err();
        assert!(matches!(err, GatewayError::Decode(msg) if msg.contains("comments")));
    }
}
