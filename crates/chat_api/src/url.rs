use url::Url;

use crate::error::ChatApiError;

/// Default base URL for chat service requests.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Normalize a configured base URL.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_BASE_URL`]
/// 2) trailing slashes, query and fragment are removed
/// 3) the URL must be hierarchical (`http://...`), not `mailto:`-style
pub fn normalize_base_url(input: &str) -> Result<Url, ChatApiError> {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let mut url =
        Url::parse(base).map_err(|error| ChatApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    if url.cannot_be_a_base() {
        return Err(ChatApiError::InvalidBaseUrl(base.to_string()));
    }

    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Endpoint table for the chat service, rooted at one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEndpoints {
    base: Url,
}

impl ChatEndpoints {
    pub fn new(base_url: &str) -> Result<Self, ChatApiError> {
        Ok(Self {
            base: normalize_base_url(base_url)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST` target for streamed replies.
    pub fn stream(&self) -> Url {
        self.join(&["chat", "stream"])
    }

    pub fn conversations(&self) -> Url {
        self.join(&["chat", "conversations"])
    }

    pub fn history(&self, conversation_id: &str) -> Url {
        self.join(&["chat", "history", conversation_id])
    }

    /// `DELETE` target for one conversation.
    pub fn conversation(&self, conversation_id: &str) -> Url {
        self.join(&["chat", "conversation", conversation_id])
    }

    /// Resolve a server-relative asset reference (an upload path, say)
    /// beneath the base URL, keeping any base path prefix. Absolute
    /// references are returned unchanged.
    pub fn resolve_asset(&self, reference: &str) -> String {
        if Url::parse(reference).is_ok() {
            return reference.to_string();
        }

        let mut base = self.base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(reference.trim_start_matches('/'))
            .map(String::from)
            .unwrap_or_else(|_| reference.to_string())
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Hierarchical URLs are enforced by `normalize_base_url`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
