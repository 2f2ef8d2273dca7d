//! Shared harness: drives the router in-process with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use ec2sim_core::prelude::*;
use ec2sim_server::xml::{self, ErrorResponse};
use ec2sim_server::{Dispatcher, router};

pub struct Endpoint {
    pub app: Router,
    pub dispatcher: Arc<Dispatcher>,
}

impl Endpoint {
    /// An endpoint over a store with no default group and running instances.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::empty())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let store = ResourceStore::new(config).into_shared();
        let dispatcher = Arc::new(Dispatcher::new(store, 256));
        Self {
            app: router(Arc::clone(&dispatcher)),
            dispatcher,
        }
    }

    pub fn store(&self) -> &SharedStore {
        self.dispatcher.store()
    }

    /// POST a form-encoded request.
    pub async fn post(&self, pairs: &[(&str, &str)]) -> (StatusCode, String) {
        let form = serde_urlencoded::to_string(pairs).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        self.send(request).await
    }

    /// GET with the parameters in the query string.
    pub async fn get(&self, pairs: &[(&str, &str)]) -> (StatusCode, String) {
        let query = serde_urlencoded::to_string(pairs).unwrap();
        let request = Request::builder()
            .method("GET")
            .uri(format!("/?{}", query))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// POST a request that must succeed, decoding its document.
    pub async fn ok<T: for<'de> serde::Deserialize<'de>>(&self, pairs: &[(&str, &str)]) -> T {
        let (status, body) = self.post(pairs).await;
        assert_eq!(status, StatusCode::OK, "request failed: {}", body);
        xml::from_xml(&body).unwrap()
    }

    /// POST a request that must fail, returning its error document.
    pub async fn err(&self, pairs: &[(&str, &str)]) -> ErrorResponse {
        let (status, body) = self.post(pairs).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "request succeeded: {}", body);
        xml::from_xml(&body).unwrap()
    }

    /// Create a group, returning its id.
    pub async fn create_group(&self, name: &str, description: &str) -> String {
        let doc: xml::CreateSecurityGroupResponse = self
            .ok(&[
                ("Action", "CreateSecurityGroup"),
                ("GroupName", name),
                ("GroupDescription", description),
            ])
            .await;
        doc.group_id
    }

    /// Describe groups with extra parameters.
    pub async fn describe_groups(&self, extra: &[(&str, &str)]) -> Vec<xml::SecurityGroupItem> {
        let mut pairs = vec![("Action", "DescribeSecurityGroups")];
        pairs.extend_from_slice(extra);
        let doc: xml::DescribeSecurityGroupsResponse = self.ok(&pairs).await;
        doc.security_group_info.item
    }

    /// Describe instances with extra parameters, flattening reservations.
    pub async fn describe_instances(&self, extra: &[(&str, &str)]) -> Vec<xml::InstanceItem> {
        let mut pairs = vec![("Action", "DescribeInstances")];
        pairs.extend_from_slice(extra);
        let doc: xml::DescribeInstancesResponse = self.ok(&pairs).await;
        doc.reservation_set
            .item
            .into_iter()
            .flat_map(|r| r.instances_set.item)
            .collect()
    }
}
