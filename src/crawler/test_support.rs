//! Scripted fetcher shared by the crawler unit tests

use crate::crawler::fetcher::{FetchError, Fetcher};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Answers each URL from a script and counts every call
///
/// A URL scripted with a sequence plays its responses in order and then keeps
/// repeating the last one. Unscripted URLs answer HTTP 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(self, url: &str, responses: Vec<Result<String, FetchError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
        self
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.sequence(url, vec![Ok(body.to_string())])
    }

    pub fn network_error(self, url: &str) -> Self {
        let error = FetchError::Network {
            url: url.to_string(),
            message: "connection reset".to_string(),
        };
        self.sequence(url, vec![Err(error)])
    }

    pub fn http_error(self, url: &str, status: u16) -> Self {
        let error = FetchError::Http {
            url: url.to_string(),
            status,
        };
        self.sequence(url, vec![Err(error)])
    }

    /// Number of fetches made for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// Every fetched URL in call order
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.log.lock().unwrap().push(url.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Err(FetchError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
