pub mod bitbucket;
pub mod github;
