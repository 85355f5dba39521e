//! Test utilities and helpers.
//!
//! Provides an in-process stand-in for the backend used across test modules.
//! This module is only compiled when running tests.

#![cfg(test)]

use crate::{
    api::{ApiGateway, LinkList, SingleLink},
    error::{ApiError, ApiResult},
    models::{Credentials, Registration, ShortLink},
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Mutex, time::Duration};

/// Password every fake account accepts.
pub const GOOD_PASSWORD: &str = "secret";

/// Build a link owned by `owner` with an empty visit history.
pub fn link_owned_by(short_id: &str, owner: &str) -> ShortLink {
    ShortLink {
        short_id: short_id.to_owned(),
        original_url: format!("https://{short_id}.example"),
        visit_history: Vec::new(),
        created_by: Some(owner.to_owned()),
    }
}

/// Scripted backend. Keeps a remote link table, records every call in order,
/// and can be told to fail or stall a named operation.
#[derive(Default)]
pub struct FakeGateway {
    links: Mutex<Vec<ShortLink>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    next_id: Mutex<u32>,
}

impl FakeGateway {
    pub fn with_links(links: Vec<ShortLink>) -> Self {
        Self {
            links: Mutex::new(links),
            ..Self::default()
        }
    }

    /// Make the next call to `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// Make every call to `op` take `delay` before answering.
    pub fn delay(&self, op: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(op, delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remote_ids(&self) -> Vec<String> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.short_id.clone())
            .collect()
    }

    async fn enter(&self, op: &'static str, arg: Option<&str>) -> ApiResult<()> {
        let entry = match arg {
            Some(arg) => format!("{op}:{arg}"),
            None => op.to_owned(),
        };
        self.calls.lock().unwrap().push(entry);

        let delay = self.delays.lock().unwrap().get(op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.lock().unwrap().remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn principal(credentials_email: &str, name: Option<&str>) -> Value {
        json!({
            "name": name.unwrap_or("Test Account"),
            "email": credentials_email,
        })
    }

    fn check_password(credentials: &Credentials) -> ApiResult<()> {
        if credentials.password == GOOD_PASSWORD {
            Ok(())
        } else {
            Err(ApiError::ServerRejected {
                status: 401,
                message: Some("Invalid email or password".into()),
            })
        }
    }
}

#[async_trait]
impl ApiGateway for FakeGateway {
    async fn login_user(&self, credentials: &Credentials) -> ApiResult<Value> {
        self.enter("login_user", Some(&credentials.email)).await?;
        Self::check_password(credentials)?;
        Ok(Self::principal(&credentials.email, None))
    }

    async fn signup_user(&self, registration: &Registration) -> ApiResult<Value> {
        self.enter("signup_user", Some(&registration.email)).await?;
        Ok(Self::principal(&registration.email, Some(&registration.name)))
    }

    async fn login_admin(&self, credentials: &Credentials) -> ApiResult<Value> {
        self.enter("login_admin", Some(&credentials.email)).await?;
        Self::check_password(credentials)?;
        Ok(Self::principal(&credentials.email, Some("Admin")))
    }

    async fn signup_admin(&self, registration: &Registration) -> ApiResult<Value> {
        self.enter("signup_admin", Some(&registration.email)).await?;
        Ok(Self::principal(&registration.email, Some(&registration.name)))
    }

    async fn list_own_links(&self) -> ApiResult<LinkList> {
        self.enter("list_own_links", None).await?;
        Ok(LinkList {
            urls: self.links.lock().unwrap().clone(),
        })
    }

    async fn create_link(&self, url: &str) -> ApiResult<SingleLink> {
        self.enter("create_link", Some(url)).await?;
        let short_id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("new{}", *next)
        };
        let link = ShortLink {
            short_id,
            original_url: url.to_owned(),
            visit_history: Vec::new(),
            created_by: None,
        };
        self.links.lock().unwrap().push(link.clone());
        Ok(SingleLink { url: link })
    }

    async fn delete_link(&self, short_id: &str) -> ApiResult<()> {
        self.enter("delete_link", Some(short_id)).await?;
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|l| l.short_id != short_id);
        if links.len() == before {
            return Err(ApiError::ServerRejected {
                status: 404,
                message: Some("URL not found".into()),
            });
        }
        Ok(())
    }

    async fn list_all_links(&self) -> ApiResult<LinkList> {
        self.enter("list_all_links", None).await?;
        Ok(LinkList {
            urls: self.links.lock().unwrap().clone(),
        })
    }

    async fn links_by_owner(&self, query: &str) -> ApiResult<LinkList> {
        self.enter("links_by_owner", Some(query)).await?;
        let urls = self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.created_by.as_deref() == Some(query))
            .cloned()
            .collect();
        Ok(LinkList { urls })
    }
}
