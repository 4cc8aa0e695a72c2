mod bitbucket;
mod github;
mod migrate;
mod mocks;
