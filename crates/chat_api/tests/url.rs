use chat_api::{normalize_base_url, ChatApiError, ChatEndpoints};

#[test]
fn blank_base_url_falls_back_to_default() {
    let url = normalize_base_url("  ").expect("default base");
    assert_eq!(url.as_str(), "http://localhost:3001/");
}

#[test]
fn trailing_slashes_and_query_are_dropped() {
    let url = normalize_base_url("https://chat.example.com/api//?x=1#frag").expect("base");
    assert_eq!(url.as_str(), "https://chat.example.com/api");
}

#[test]
fn non_hierarchical_base_is_rejected() {
    assert!(matches!(
        normalize_base_url("mailto:someone@example.com"),
        Err(ChatApiError::InvalidBaseUrl(_))
    ));
    assert!(matches!(
        normalize_base_url("not a url"),
        Err(ChatApiError::InvalidBaseUrl(_))
    ));
}

#[test]
fn endpoints_hang_off_the_base_path() {
    let endpoints = ChatEndpoints::new("https://chat.example.com/api/").expect("endpoints");

    assert_eq!(
        endpoints.stream().as_str(),
        "https://chat.example.com/api/chat/stream"
    );
    assert_eq!(
        endpoints.conversations().as_str(),
        "https://chat.example.com/api/chat/conversations"
    );
    assert_eq!(
        endpoints.history("abc").as_str(),
        "https://chat.example.com/api/chat/history/abc"
    );
    assert_eq!(
        endpoints.conversation("abc").as_str(),
        "https://chat.example.com/api/chat/conversation/abc"
    );
}

#[test]
fn conversation_ids_are_percent_encoded() {
    let endpoints = ChatEndpoints::new("http://localhost:3001").expect("endpoints");
    assert_eq!(
        endpoints.history("a/b c").as_str(),
        "http://localhost:3001/chat/history/a%2Fb%20c"
    );
}

#[test]
fn relative_assets_resolve_against_the_base() {
    let endpoints = ChatEndpoints::new("http://localhost:3001").expect("endpoints");

    assert_eq!(
        endpoints.resolve_asset("/uploads/cat.png"),
        "http://localhost:3001/uploads/cat.png"
    );
    assert_eq!(
        endpoints.resolve_asset("https://cdn.example.com/cat.png"),
        "https://cdn.example.com/cat.png"
    );
}

#[test]
fn relative_assets_keep_the_base_path_prefix() {
    let endpoints = ChatEndpoints::new("http://host.example/api/").expect("endpoints");

    assert_eq!(
        endpoints.resolve_asset("uploads/a.png"),
        "http://host.example/api/uploads/a.png"
    );
    assert_eq!(
        endpoints.resolve_asset("/uploads/a.png"),
        "http://host.example/api/uploads/a.png"
    );
}
