use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN_PLATFORM: &str = "Unknown Platform";

/// A generated post for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub platform: String,
    pub content: String,
}

impl Post {
    pub fn new(platform: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            content: content.into(),
        }
    }

    /// Download name for the post, e.g. `linkedin_post.txt`.
    pub fn file_name(&self) -> String {
        let platform = self.platform.to_lowercase().replace(['/', '\\'], "_");
        format!("{platform}_post.txt")
    }
}

/// Decode the agent's `{"response": [{"platform", "content"}, ...]}` payload.
///
/// Only an unparseable payload or a missing `response` array fails; a post
/// with missing fields is kept with `Unknown Platform` / empty content.
pub fn decode(raw_output: &str) -> Result<Vec<Post>> {
    let parsed: Value = serde_json::from_str(raw_output)
        .map_err(|e| Error::MalformedOutput(format!("not valid JSON ({e})")))?;

    let entries = parsed
        .get("response")
        .ok_or_else(|| Error::MalformedOutput("missing `response` key".to_string()))?
        .as_array()
        .ok_or_else(|| Error::MalformedOutput("`response` is not a list".to_string()))?;

    let posts: Vec<Post> = entries
        .iter()
        .map(|entry| {
            let field = |name: &str| entry.get(name).and_then(Value::as_str);
            Post {
                platform: field("platform").unwrap_or(UNKNOWN_PLATFORM).to_string(),
                content: field("content").unwrap_or_default().to_string(),
            }
        })
        .collect();

    tracing::debug!(posts = posts.len(), "decoded agent output");
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_post_payload() {
        let posts = decode(r#"{"response":[{"platform":"LinkedIn","content":"X"}]}"#).unwrap();
        assert_eq!(posts, vec![Post::new("LinkedIn", "X")]);
    }

    #[test]
    fn keeps_agent_order() {
        let posts = decode(
            r#"{"response":[
                {"platform":"Twitter","content":"short"},
                {"platform":"LinkedIn","content":"long"}
            ]}"#,
        )
        .unwrap();
        let platforms: Vec<_> = posts.iter().map(|p| p.platform.as_str()).collect();
        assert_eq!(platforms, ["Twitter", "LinkedIn"]);
    }

    #[test]
    fn missing_fields_degrade_per_post() {
        let posts = decode(
            r#"{"response":[
                {"platform":"Instagram"},
                {"content":"orphan"},
                {"platform":"Twitter","content":"ok"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(posts[0], Post::new("Instagram", ""));
        assert_eq!(posts[1], Post::new(UNKNOWN_PLATFORM, "orphan"));
        assert_eq!(posts[2], Post::new("Twitter", "ok"));
    }

    #[test]
    fn empty_response_list_is_fine() {
        assert!(decode(r#"{"response":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn decoding_is_repeatable() {
        let raw = r#"{"response":[{"platform":"LinkedIn","content":"X"},{"platform":"Twitter"}]}"#;
        assert_eq!(decode(raw).unwrap(), decode(raw).unwrap());
    }

    #[test]
    fn malformed_payloads_fail_whole_request() {
        for raw in [
            r#""just a string""#,
            "not json at all",
            r#"{"posts":[]}"#,
            r#"{"response":"LinkedIn: X"}"#,
            r#"[{"platform":"LinkedIn","content":"X"}]"#,
        ] {
            let err = decode(raw).unwrap_err();
            assert!(matches!(err, Error::MalformedOutput(_)), "{raw} -> {err}");
        }
    }

    #[test]
    fn file_name_is_lowercased_platform() {
        assert_eq!(Post::new("LinkedIn", "x").file_name(), "linkedin_post.txt");
        assert_eq!(Post::new("X/Twitter", "x").file_name(), "x_twitter_post.txt");
    }
}
