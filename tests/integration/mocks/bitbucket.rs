use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

/// `Basic` credentials of the shared fixture config, `jdoe:token`.
pub const BASIC_AUTH: &str = "Basic amRvZTp0b2tlbg==";

pub fn repo_json(group: &str, slug: &str, fork: bool) -> serde_json::Value {
    let mut repo = json!({
        "slug": slug,
        "name": slug.to_uppercase(),
        "links": {
            "clone": [
                { "href": format!("ssh://git@bitbucket.example.com:7999/{}/{}.git", group, slug), "name": "ssh" },
                { "href": format!("https://bitbucket.example.com/scm/{}/{}.git", group, slug), "name": "http" }
            ]
        }
    });
    if fork {
        repo["origin"] = json!({ "slug": slug, "project": { "key": "ACME" } });
    }
    repo
}

pub fn list_repos_mock(
    group: &str,
    start: u32,
    repos: Vec<serde_json::Value>,
    next_page_start: Option<u32>,
) -> Mock {
    let body = json!({
        "size": repos.len(),
        "limit": 100,
        "start": start,
        "isLastPage": next_page_start.is_none(),
        "nextPageStart": next_page_start,
        "values": repos,
    });

    Mock::given(method("GET"))
        .and(path(format!(
            "/rest/api/1.0/projects/{group}/repos",
            group = group
        )))
        .and(query_param("start", start.to_string()))
        .and(query_param("limit", "100"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
}

pub fn project_mock(key: &str, name: &str) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/rest/api/1.0/projects/{key}", key = key)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "key": key, "name": name })),
        )
        .expect(1)
}
