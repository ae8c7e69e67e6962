//! Types and enums used across the UI

use crate::client::{CacheClearResponse, ScanResponse};
use crate::controller::SearchRequest;
use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    BasePath,
    Search,
    Results,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::BasePath => Focus::Search,
            Focus::Search => Focus::Results,
            Focus::Results => Focus::BasePath,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Focus::BasePath => Focus::Results,
            Focus::Search => Focus::BasePath,
            Focus::Results => Focus::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

pub struct ActiveSearch {
    pub request: SearchRequest,
    pub handle: tokio::task::JoinHandle<Result<ScanResponse, SearchError>>,
}

pub type ActiveCacheClear = tokio::task::JoinHandle<Result<CacheClearResponse, SearchError>>;
