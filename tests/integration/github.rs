use repomigrate::cli::AccessLevel;
use repomigrate::github_provider::GithubProvider;
use repomigrate::provider::{DestinationProvider, DestinationRepo, Team};
use reqwest::Url;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::mocks::github::{
    create_org_repo_mock, create_user_repo_mock, grant_mock, org_repos_mock, orgs_mock,
    repo_teams_mock, team_json, teams_mock, user_repos_mock,
};

fn provider(server: &MockServer) -> GithubProvider {
    GithubProvider::configure_provider(
        &Url::parse(&format!("{}/", server.uri())).unwrap(),
        "ghp_token",
    )
    .unwrap()
}

fn owners() -> Team {
    Team {
        id: 1,
        name: "TEAM_Owners".to_string(),
        slug: "team-owners".to_string(),
    }
}

fn sed_repo(name: &str) -> DestinationRepo {
    DestinationRepo {
        name: name.to_string(),
        owner: "SED".to_string(),
        clone_url: format!("https://github.example.com/SED/{}.git", name),
    }
}

#[tokio::test]
async fn lists_organisation_state() {
    let mock_server = MockServer::start().await;
    orgs_mock(&["OTHER", "SED"]).mount(&mock_server).await;
    teams_mock(
        "SED",
        vec![team_json(1, "TEAM_Owners", None), team_json(3, "TEAM_Developers", None)],
    )
    .mount(&mock_server)
    .await;
    org_repos_mock("SED", &["TEAM-ACME-api"]).mount(&mock_server).await;
    user_repos_mock("migrator", &["dotfiles"]).mount(&mock_server).await;
    let provider = provider(&mock_server);

    let orgs = provider.organizations().await.unwrap();
    let teams = provider.teams("SED").await.unwrap();
    let repos = provider.org_repos("SED").await.unwrap();
    let own = provider.user_repos().await.unwrap();

    assert_eq!(orgs[1].login, "SED");
    assert_eq!(teams[0], owners());
    assert_eq!(repos, vec![sed_repo("TEAM-ACME-api")]);
    assert_eq!(own[0].owner, "migrator");
}

#[tokio::test]
async fn follows_link_header_pagination() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 2, "login": "SED" }])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    format!(
                        "<{}/user/orgs?per_page=100&page=2>; rel=\"next\"",
                        mock_server.uri()
                    )
                    .as_str(),
                )
                .set_body_json(json!([{ "id": 1, "login": "OTHER" }])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let orgs = provider(&mock_server).organizations().await.unwrap();

    let logins: Vec<_> = orgs.iter().map(|o| o.login.as_str()).collect();
    assert_eq!(logins, vec!["OTHER", "SED"]);
}

#[tokio::test]
async fn creates_private_repositories() {
    let mock_server = MockServer::start().await;
    create_org_repo_mock("SED", "TEAM-ACME-widgets", 1)
        .mount(&mock_server)
        .await;
    create_user_repo_mock("migrator", "dotfiles")
        .mount(&mock_server)
        .await;
    let provider = provider(&mock_server);

    let org_repo = provider
        .create_org_repo("SED", "TEAM-ACME-widgets", 1)
        .await
        .unwrap();
    let user_repo = provider.create_user_repo("dotfiles").await.unwrap();

    assert_eq!(org_repo, sed_repo("TEAM-ACME-widgets"));
    assert_eq!(user_repo.owner, "migrator");
}

#[tokio::test]
async fn reads_team_permission_on_repository() {
    let mock_server = MockServer::start().await;
    repo_teams_mock(
        "SED",
        "TEAM-ACME-api",
        vec![team_json(1, "TEAM_Owners", Some("maintain")), team_json(2, "TEAM_Integrators", Some("pull"))],
    )
    .mount(&mock_server)
    .await;
    let provider = provider(&mock_server);
    let stranger = Team {
        id: 9,
        name: "TEAM_Strangers".to_string(),
        slug: "team-strangers".to_string(),
    };

    let owners_level = provider
        .team_permission("SED", &owners(), &sed_repo("TEAM-ACME-api"))
        .await
        .unwrap();
    let stranger_level = provider
        .team_permission("SED", &stranger, &sed_repo("TEAM-ACME-api"))
        .await
        .unwrap();

    assert_eq!(owners_level, Some(AccessLevel::Write));
    assert_eq!(stranger_level, None);
}

#[tokio::test]
async fn grants_team_permission() {
    let mock_server = MockServer::start().await;
    grant_mock("SED", "team-owners", "SED", "TEAM-ACME-api", "admin")
        .expect(1)
        .mount(&mock_server)
        .await;

    provider(&mock_server)
        .grant_team("SED", &owners(), &sed_repo("TEAM-ACME-api"), AccessLevel::Admin)
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_grant_is_an_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .mount(&mock_server)
        .await;

    let result = provider(&mock_server)
        .grant_team("SED", &owners(), &sed_repo("TEAM-ACME-api"), AccessLevel::Read)
        .await;

    assert!(result.is_err());
}
