pub mod bitbucket_provider;
pub mod cli;
pub mod destination;
pub mod error;
pub mod event;
pub mod fixtures;
pub mod git;
pub mod github_provider;
pub mod ignore;
pub mod mirror;
pub mod naming;
pub mod pipeline;
pub mod provider;
pub mod repository;
pub mod retry;
pub mod source;
