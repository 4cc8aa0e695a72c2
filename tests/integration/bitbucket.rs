use repomigrate::bitbucket_provider::BitbucketProvider;
use repomigrate::provider::SourceProvider;
use repomigrate::repository::GroupSlug;
use reqwest::Url;
use wiremock::MockServer;

use crate::mocks::bitbucket::{list_repos_mock, project_mock, repo_json};

fn provider(server: &MockServer) -> BitbucketProvider {
    BitbucketProvider::new(
        Url::parse(&format!("{}/", server.uri())).unwrap(),
        "jdoe",
        "token",
    )
}

#[tokio::test]
async fn list_repos_follows_pages() {
    let mock_server = MockServer::start().await;

    list_repos_mock(
        "ACME",
        0,
        vec![repo_json("acme", "api", false), repo_json("acme", "widgets", false)],
        Some(2),
    )
    .mount(&mock_server)
    .await;
    list_repos_mock("ACME", 2, vec![repo_json("acme", "tools", false)], None)
        .mount(&mock_server)
        .await;

    let repos = provider(&mock_server)
        .list_repos(&GroupSlug::parse("ACME"))
        .await
        .unwrap();

    let slugs: Vec<_> = repos.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["api", "widgets", "tools"]);
    assert_eq!(
        repos[0].http_clone_url(),
        Some("https://bitbucket.example.com/scm/acme/api.git")
    );
}

#[tokio::test]
async fn list_repos_reports_forks_in_personal_namespaces() {
    let mock_server = MockServer::start().await;

    list_repos_mock(
        "~jdoe",
        0,
        vec![repo_json("~jdoe", "api", true), repo_json("~jdoe", "dotfiles", false)],
        None,
    )
    .mount(&mock_server)
    .await;

    let repos = provider(&mock_server)
        .list_repos(&GroupSlug::parse("~jdoe"))
        .await
        .unwrap();

    assert!(repos[0].is_fork);
    assert!(!repos[1].is_fork);
}

#[tokio::test]
async fn project_display_name_comes_from_the_platform() {
    let mock_server = MockServer::start().await;
    project_mock("ACME", "Acme Corporation").mount(&mock_server).await;
    let provider = provider(&mock_server);

    let project = provider
        .group_display_name(&GroupSlug::parse("ACME"))
        .await
        .unwrap();
    let user = provider
        .group_display_name(&GroupSlug::parse("~jdoe"))
        .await
        .unwrap();

    assert_eq!(project, "Acme Corporation");
    assert_eq!(user, "~jdoe");
}

#[tokio::test]
async fn missing_project_is_an_error() {
    let mock_server = MockServer::start().await;

    let err = provider(&mock_server)
        .list_repos(&GroupSlug::parse("NOPE"))
        .await;

    assert!(err.is_err());
}
