use crate::error::{Error, Result};
use derive_more::Display;

/// Platforms known to the CLI. Any other label is still accepted.
pub const KNOWN_PLATFORMS: &[&str] = &["LinkedIn", "Instagram", "Twitter"];

/// Platforms a request asks for, in the caller's order, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRequest {
    platforms: Vec<String>,
}

impl PlatformRequest {
    /// Blank labels are ignored; duplicates are compared case-insensitively
    /// and the first spelling wins.
    pub fn new<I, S>(platforms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for platform in platforms {
            let platform = platform.as_ref().trim();
            if platform.is_empty() {
                continue;
            }
            if !unique.iter().any(|p| p.eq_ignore_ascii_case(platform)) {
                unique.push(platform.to_string());
            }
        }

        if unique.is_empty() {
            return Err(Error::NoPlatformSelected);
        }

        Ok(Self { platforms: unique })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.platforms
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// "LinkedIn and Instagram"
    pub fn conjunction(&self) -> String {
        self.platforms.join(" and ")
    }
}

/// The single user message handed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{_0}")]
pub struct GenerationInstruction(String);

impl GenerationInstruction {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn compose(
    video_transcript: &str,
    user_query: Option<&str>,
    platforms: &PlatformRequest,
) -> GenerationInstruction {
    let platforms = platforms.conjunction();
    let text = match user_query.filter(|q| !q.is_empty()) {
        Some(query) => {
            format!("{query} for {platforms} based on this video transcript: {video_transcript}")
        }
        None => {
            format!("Generate {platforms} posts based on this video transcript: {video_transcript}")
        }
    };
    GenerationInstruction(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(names: &[&str]) -> PlatformRequest {
        PlatformRequest::new(names.iter().copied()).unwrap()
    }

    #[test]
    fn default_branch_starts_with_generate() {
        let out = compose("the talk", None, &request(&["LinkedIn", "Instagram"]));
        assert_eq!(
            out.as_str(),
            "Generate LinkedIn and Instagram posts based on this video transcript: the talk"
        );
    }

    #[test]
    fn empty_query_uses_default_branch() {
        let out = compose("t", Some(""), &request(&["Twitter"]));
        assert!(out.as_str().starts_with("Generate"));
    }

    #[test]
    fn query_is_used_verbatim() {
        let out = compose("t", Some("  Write"), &request(&["LinkedIn"]));
        assert!(out.as_str().starts_with("  Write for LinkedIn"));

        let out = compose("t", Some("   "), &request(&["LinkedIn"]));
        assert_eq!(out.as_str(), "    for LinkedIn based on this video transcript: t");
    }

    #[test]
    fn query_branch_starts_with_query() {
        let out = compose(
            "the talk",
            Some("Write a punchy thread"),
            &request(&["Twitter"]),
        );
        assert_eq!(
            out.as_str(),
            "Write a punchy thread for Twitter based on this video transcript: the talk"
        );
    }

    #[test]
    fn every_platform_and_full_transcript_appear() {
        let transcript = "one two three. Four, five: six!";
        let platforms = request(&["LinkedIn", "Instagram", "Twitter"]);
        for query in [None, Some("Make it fun")] {
            let out = compose(transcript, query, &platforms);
            for p in platforms.as_slice() {
                assert!(out.as_str().contains(p.as_str()));
            }
            assert!(out.as_str().contains(transcript));
        }
    }

    #[test]
    fn selection_order_is_preserved() {
        let out = compose("t", None, &request(&["Twitter", "LinkedIn"]));
        assert!(out.as_str().starts_with("Generate Twitter and LinkedIn posts"));
    }

    #[test]
    fn duplicates_are_folded_case_insensitively() {
        let req = request(&["LinkedIn", "linkedin", " Twitter ", ""]);
        assert_eq!(req.as_slice(), &["LinkedIn".to_string(), "Twitter".to_string()]);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let none: [&str; 0] = [];
        assert!(matches!(PlatformRequest::new(none), Err(Error::NoPlatformSelected)));
        assert!(matches!(PlatformRequest::new([" "]), Err(Error::NoPlatformSelected)));
    }
}
