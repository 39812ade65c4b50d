//! Tests for precondition and lifecycle errors that need no browser.
//!
//! Argument checks run before any DOM access, and an uninitialized session
//! must refuse every primitive, so none of these tests launch Chrome.

use webnavigator::{BrowserError, BrowserSession};

#[tokio::test]
async fn test_primitives_fail_before_initialize() {
    let session = BrowserSession::new();

    assert!(matches!(
        session.visit("https://example.com").await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.page_content().await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.page_source().await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.scan_interactive_elements().await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.click_by_text("Login", false).await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.fill_text("#box", "hello").await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.click_element("#box").await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.current_url().await,
        Err(BrowserError::NotInitialized)
    ));
    assert!(matches!(
        session.title().await,
        Err(BrowserError::NotInitialized)
    ));
}

#[tokio::test]
async fn test_empty_arguments_rejected_before_dom_access() {
    // Argument preconditions are checked first, so even an uninitialized
    // session reports InvalidArgument rather than NotInitialized.
    let session = BrowserSession::new();

    assert!(matches!(
        session.fill_text("", "hello").await,
        Err(BrowserError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.fill_text("#box", "").await,
        Err(BrowserError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.click_element("").await,
        Err(BrowserError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.click_by_text("", false).await,
        Err(BrowserError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.click_by_text("", true).await,
        Err(BrowserError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_teardown_is_idempotent_on_uninitialized_session() {
    let mut session = BrowserSession::new();
    assert!(!session.is_initialized());

    session.teardown().await;
    session.teardown().await;

    assert!(!session.is_initialized());
    assert!(!session.is_alive().await);
}

#[tokio::test]
async fn test_not_found_error_carries_search_text() {
    let error = BrowserError::TextNotFound("nonexistent-xyz".to_string());
    assert!(error.to_string().contains("nonexistent-xyz"));

    let error = BrowserError::ElementNotFound("#missing".to_string());
    assert!(error.to_string().contains("#missing"));
}
