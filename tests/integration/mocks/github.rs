use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockBuilder, ResponseTemplate};

pub fn repo_json(owner: &str, name: &str) -> serde_json::Value {
    json!({
        "id": 1,
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "private": true,
        "owner": { "login": owner, "id": 7 },
        "clone_url": format!("https://github.example.com/{}/{}.git", owner, name)
    })
}

pub fn team_json(id: u64, name: &str, permission: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase().replace('_', "-"),
        "permission": permission
    })
}

fn list(route: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .and(query_param("per_page", "100"))
}

fn ok(response: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(response)
}

pub fn orgs_mock(logins: &[&str]) -> Mock {
    let orgs: Vec<_> = logins
        .iter()
        .enumerate()
        .map(|(id, login)| json!({ "id": id, "login": login }))
        .collect();

    list("/user/orgs").respond_with(ok(json!(orgs))).expect(1)
}

pub fn teams_mock(org: &str, teams: Vec<serde_json::Value>) -> Mock {
    list(&format!("/orgs/{org}/teams", org = org))
        .respond_with(ok(json!(teams)))
        .expect(1)
}

pub fn org_repos_mock(org: &str, names: &[&str]) -> Mock {
    let repos: Vec<_> = names.iter().map(|name| repo_json(org, name)).collect();

    list(&format!("/orgs/{org}/repos", org = org))
        .and(query_param("type", "all"))
        .respond_with(ok(json!(repos)))
        .expect(1)
}

pub fn user_repos_mock(owner: &str, names: &[&str]) -> Mock {
    let repos: Vec<_> = names.iter().map(|name| repo_json(owner, name)).collect();

    list("/user/repos")
        .and(query_param("affiliation", "owner"))
        .respond_with(ok(json!(repos)))
        .expect(1)
}

pub fn create_org_repo_mock(org: &str, name: &str, team_id: u64) -> Mock {
    Mock::given(method("POST"))
        .and(path(format!("/orgs/{org}/repos", org = org)))
        .and(body_json(json!({
            "name": name,
            "private": true,
            "has_wiki": false,
            "team_id": team_id
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(repo_json(org, name)))
        .expect(1)
}

pub fn create_user_repo_mock(owner: &str, name: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(body_json(json!({
            "name": name,
            "private": true,
            "has_wiki": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(repo_json(owner, name)))
        .expect(1)
}

pub fn repo_teams_mock(owner: &str, repo: &str, teams: Vec<serde_json::Value>) -> Mock {
    list(&format!("/repos/{owner}/{repo}/teams", owner = owner, repo = repo))
        .respond_with(ok(json!(teams)))
}

pub fn grant_mock(org: &str, team_slug: &str, owner: &str, repo: &str, permission: &str) -> Mock {
    Mock::given(method("PUT"))
        .and(path(format!(
            "/orgs/{org}/teams/{team}/repos/{owner}/{repo}",
            org = org,
            team = team_slug,
            owner = owner,
            repo = repo
        )))
        .and(body_json(json!({ "permission": permission })))
        .respond_with(ResponseTemplate::new(204))
}
