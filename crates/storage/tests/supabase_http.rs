use hub_core::model::{Category, EventType, QueuedEvent, SessionId, UserId};
use hub_core::time::fixed_now;
use mockito::{Matcher, Server};
use storage::StorageError;
use storage::repository::{
    AuthBackend, AuthChange, EventRow, EventSink, FileStore, ProfileRepository,
    ProgressRepository, ProgressRow,
};
use storage::supabase::{SupabaseBackend, SupabaseConfig};

const ANON: &str = "anon-key";

fn backend(server: &Server) -> SupabaseBackend {
    SupabaseBackend::new(SupabaseConfig::new(server.url(), ANON)).unwrap()
}

fn token_body(user_id: &str) -> String {
    format!(
        r#"{{"access_token":"jwt-1","token_type":"bearer","expires_in":3600,
            "refresh_token":"r-1","user":{{"id":"{user_id}","email":"a@example.com",
            "user_metadata":{{"full_name":"Ada"}}}}}}"#
    )
}

async fn signed_in(server: &mut Server) -> SupabaseBackend {
    server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("u1"))
        .create_async()
        .await;
    let backend = backend(server);
    backend
        .sign_in_with_password("a@example.com", "pw")
        .await
        .unwrap();
    backend
}

#[tokio::test]
async fn password_sign_in_stores_session_and_broadcasts() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .match_header("apikey", ANON)
        .match_body(Matcher::PartialJsonString(
            r#"{"email":"a@example.com","password":"pw"}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("u1"))
        .create_async()
        .await;

    let backend = backend(&server);
    let mut changes = backend.subscribe();
    let session = backend
        .sign_in_with_password("a@example.com", "pw")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(session.user.id, UserId::new("u1"));
    assert_eq!(session.user.full_name(), Some("Ada"));
    assert!(session.expires_at.is_some());
    assert!(matches!(changes.recv().await.unwrap(), AuthChange::SignedIn(_)));
    assert!(backend.get_session().await.unwrap().is_some());
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
        .create_async()
        .await;

    let err = backend(&server)
        .sign_in_with_password("a@example.com", "wrong")
        .await
        .unwrap_err();
    match err {
        StorageError::Unauthorized(message) => assert_eq!(message, "Invalid login credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sign_up_awaiting_confirmation_returns_none() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/v1/signup")
        .match_query(Matcher::UrlEncoded(
            "redirect_to".into(),
            "https://hub.example.com/#dashboard".into(),
        ))
        .with_status(200)
        .with_body(r#"{"id":"u9","email":"new@example.com","confirmation_sent_at":"2024-01-01T00:00:00Z"}"#)
        .create_async()
        .await;

    let outcome = backend(&server)
        .sign_up("new@example.com", "pw", Some("https://hub.example.com/#dashboard"))
        .await
        .unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn oauth_authorize_url_carries_redirect_and_scopes() {
    let server = Server::new_async().await;
    let url = backend(&server)
        .sign_in_with_oauth("google", "https://hub.example.com/#dashboard")
        .await
        .unwrap();
    assert!(url.starts_with(&format!("{}/auth/v1/authorize?", server.url())));
    assert!(url.contains("provider=google"));
    assert!(url.contains("redirect_to=https%3A%2F%2Fhub.example.com%2F%23dashboard"));
    assert!(url.contains("scopes=openid+profile+email"));
}

#[tokio::test]
async fn oauth_callback_fetches_user_with_fragment_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/auth/v1/user")
        .match_header("authorization", "Bearer tok-9")
        .with_status(200)
        .with_body(r#"{"id":"u9","email":"g@example.com","user_metadata":{"name":"Grace"}}"#)
        .create_async()
        .await;

    let backend = backend(&server);
    let session = backend
        .complete_oauth_redirect("https://hub.example.com/#access_token=tok-9&expires_in=3600")
        .await
        .unwrap()
        .unwrap();
    mock.assert_async().await;
    assert_eq!(session.user.full_name(), Some("Grace"));
    assert_eq!(
        backend.get_session().await.unwrap().map(|s| s.access_token),
        Some("tok-9".to_string())
    );
}

#[tokio::test]
async fn upsert_uses_conflict_target_and_session_token() {
    let mut server = Server::new_async().await;
    let backend = signed_in(&mut server).await;
    let stored = r#"[{"intern_id":"u1","category":"n8n","completed_tasks":[true,false],
        "task_notes":{},"progress_percent":50,"cohort":"default",
        "last_updated":"2023-11-14T22:13:20Z"}]"#;
    let mock = server
        .mock("POST", "/rest/v1/intern_progress")
        .match_query(Matcher::UrlEncoded(
            "on_conflict".into(),
            "intern_id,category".into(),
        ))
        .match_header("authorization", "Bearer jwt-1")
        .match_header("prefer", "resolution=merge-duplicates,return=representation")
        .match_body(Matcher::Regex(r#""intern_id":"u1""#.to_string()))
        .with_status(201)
        .with_body(stored)
        .create_async()
        .await;

    let row = ProgressRow {
        intern_id: UserId::new("u1"),
        category: Category::N8n,
        user_email: Some("a@example.com".into()),
        completed_tasks: vec![true, false],
        task_notes: Default::default(),
        progress_percent: 50,
        cohort: Some("default".into()),
        last_updated: Some(fixed_now()),
    };
    let saved = backend.upsert_progress(&row).await.unwrap();
    mock.assert_async().await;
    assert_eq!(saved.progress_percent, 50);
}

#[tokio::test]
async fn select_progress_filters_by_user_and_slug() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/v1/intern_progress")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("intern_id".into(), "eq.u1".into()),
            Matcher::UrlEncoded("category".into(), "eq.ai-developments-tools".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let row = backend(&server)
        .select_progress(&UserId::new("u1"), Category::AiTools)
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn profile_select_falls_back_to_base_columns() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::UrlEncoded(
            "select".into(),
            "id,role,resume_url,full_name,email,cohort".into(),
        ))
        .with_status(400)
        .with_body(r#"{"message":"column profiles.cohort does not exist"}"#)
        .create_async()
        .await;
    let fallback = server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::UrlEncoded("select".into(), "id,role,email".into()))
        .with_status(200)
        .with_body(r#"[{"id":"u1","role":"admin","email":"a@example.com"}]"#)
        .create_async()
        .await;

    let profile = backend(&server)
        .get_profile(&UserId::new("u1"))
        .await
        .unwrap()
        .unwrap();
    fallback.assert_async().await;
    assert_eq!(profile.role.as_deref(), Some("admin"));
    assert_eq!(profile.cohort, None);
}

#[tokio::test]
async fn event_batch_is_posted_once() {
    let mut server = Server::new_async().await;
    let ok = server
        .mock("POST", "/rest/v1/page_events")
        .match_body(Matcher::Regex(r#""event_type":"enter""#.to_string()))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let backend = backend(&server);
    let event = QueuedEvent::new(None, "n8n", EventType::Enter, SessionId::random(), fixed_now());
    backend
        .insert_events(&[EventRow::from(&event)])
        .await
        .unwrap();
    backend.insert_events(&[]).await.unwrap();
    ok.assert_async().await;
}

#[tokio::test]
async fn rejected_event_batch_surfaces_status() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/rest/v1/page_events")
        .with_status(503)
        .create_async()
        .await;

    let event = QueuedEvent::new(None, "n8n", EventType::Exit, SessionId::random(), fixed_now());
    let err = backend(&server)
        .insert_events(&[EventRow::from(&event)])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Rejected { status: 503, .. }));
}

#[tokio::test]
async fn upload_returns_public_url() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/storage/v1/object/resumes/u1/resume.pdf")
        .match_header("x-upsert", "true")
        .match_header("content-type", "application/pdf")
        .with_status(200)
        .with_body(r#"{"Key":"resumes/u1/resume.pdf"}"#)
        .create_async()
        .await;

    let url = backend(&server)
        .upload_file("resumes", "u1/resume.pdf", b"%PDF".to_vec(), "application/pdf")
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(
        url,
        format!("{}/storage/v1/object/public/resumes/u1/resume.pdf", server.url())
    );
}

#[tokio::test]
async fn sign_out_clears_session_even_if_remote_fails() {
    let mut server = Server::new_async().await;
    let backend = signed_in(&mut server).await;
    let mut changes = backend.subscribe();
    server
        .mock("POST", "/auth/v1/logout")
        .with_status(500)
        .create_async()
        .await;

    backend.sign_out().await.unwrap();
    assert_eq!(changes.recv().await.unwrap(), AuthChange::SignedOut);
    assert!(backend.get_session().await.unwrap().is_none());
}
