/*
 * SPDX-FileCopyrightText: Copyright (c) 2023 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a
 * copy of this software and associated documentation files (the "Software"),
 * to deal in the Software without restriction, including without limitation
 * the rights to use, copy, modify, merge, publish, distribute, sublicense,
 * and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
 * THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
 * DEALINGS IN THE SOFTWARE.
 */

//! An in-process iDRAC speaking just enough Redfish for session login, the SCP import action
//! and job polling. Serves plain HTTP on 127.0.0.1.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use idrac_scp::{Endpoint, RedfishClientPool};
use serde_json::{json, Value};

pub const MANAGER_ID: &str = "iDRAC.Embedded.1";
pub const JOB_ID: &str = "JID_467696531451";
pub const USER: &str = "root";
pub const PASSWORD: &str = "calvin";
const TOKEN: &str = "5a2f4a4ccf0a4e2db1e4c7e3d3e9b0f1";
const SESSION_ID: &str = "7";

pub struct MockBmc {
    pub vendor: &'static str,
    /// Answer login with X-Auth-Token. Without it every call must use basic auth.
    pub issue_token: bool,
    /// GET Managers answers 500.
    pub fail_managers: bool,
    pub jobs: Mutex<VecDeque<(&'static str, &'static str)>>,
    pub imports: Mutex<Vec<Value>>,
    pub sessions_created: AtomicUsize,
    pub sessions_deleted: AtomicUsize,
    pub job_polls: AtomicUsize,
    pub unauthorized: AtomicUsize,
}

impl MockBmc {
    pub fn dell() -> MockBmc {
        MockBmc {
            vendor: "Dell",
            issue_token: true,
            fail_managers: false,
            jobs: Mutex::new(VecDeque::from([(
                "Completed",
                "Successfully imported and applied Server Configuration Profile.",
            )])),
            imports: Mutex::new(Vec::new()),
            sessions_created: AtomicUsize::new(0),
            sessions_deleted: AtomicUsize::new(0),
            job_polls: AtomicUsize::new(0),
            unauthorized: AtomicUsize::new(0),
        }
    }

    /// (JobState, Message) handed out by successive job polls. The last one repeats.
    pub fn with_job_states(self, states: &[(&'static str, &'static str)]) -> MockBmc {
        *self.jobs.lock().unwrap() = states.iter().copied().collect();
        self
    }

    pub fn imports(&self) -> Vec<Value> {
        self.imports.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn next_job_state(&self) -> (&'static str, &'static str) {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.len() > 1 {
            jobs.pop_front().unwrap()
        } else {
            jobs[0]
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let ok = if self.issue_token {
            headers
                .get("x-auth-token")
                .is_some_and(|t| t.as_bytes() == TOKEN.as_bytes())
        } else {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("Basic "))
        };
        if !ok {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
        }
        ok
    }
}

type Shared = Arc<MockBmc>;

fn redfish_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"@Message.ExtendedInfo": [{"Message": message}]}})),
    )
        .into_response()
}

async fn service_root(State(bmc): State<Shared>) -> Json<Value> {
    Json(json!({
        "@odata.id": "/redfish/v1",
        "@odata.type": "#ServiceRoot.v1_11_0.ServiceRoot",
        "Product": "Integrated Dell Remote Access Controller",
        "RedfishVersion": "1.17.0",
        "Vendor": bmc.vendor,
        "Managers": {"@odata.id": "/redfish/v1/Managers"},
        "SessionService": {"@odata.id": "/redfish/v1/SessionService"},
        "Systems": {"@odata.id": "/redfish/v1/Systems"}
    }))
}

async fn create_session(State(bmc): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["UserName"] != USER || body["Password"] != PASSWORD {
        return redfish_error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    bmc.sessions_created.fetch_add(1, Ordering::SeqCst);
    let uri = format!("/redfish/v1/SessionService/Sessions/{SESSION_ID}");
    let mut headers = HeaderMap::new();
    if bmc.issue_token {
        headers.insert(
            HeaderName::from_static("x-auth-token"),
            HeaderValue::from_static(TOKEN),
        );
        headers.insert(header::LOCATION, HeaderValue::from_str(&uri).unwrap());
    }
    let session = json!({
        "@odata.id": uri,
        "@odata.type": "#Session.v1_6_0.Session",
        "Id": SESSION_ID,
        "UserName": USER
    });
    (StatusCode::CREATED, headers, Json(session)).into_response()
}

async fn delete_session(
    State(bmc): State<Shared>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !bmc.authorized(&headers) {
        return redfish_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if session_id != SESSION_ID {
        return redfish_error(StatusCode::NOT_FOUND, "No such session");
    }
    bmc.sessions_deleted.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK.into_response()
}

async fn managers(State(bmc): State<Shared>, headers: HeaderMap) -> Response {
    if !bmc.authorized(&headers) {
        return redfish_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if bmc.fail_managers {
        return redfish_error(StatusCode::INTERNAL_SERVER_ERROR, "Manager unavailable");
    }
    Json(json!({
        "@odata.id": "/redfish/v1/Managers",
        "@odata.type": "#ManagerCollection.ManagerCollection",
        "Name": "Manager Collection",
        "Members": [{"@odata.id": format!("/redfish/v1/Managers/{MANAGER_ID}")}],
        "Members@odata.count": 1
    }))
    .into_response()
}

async fn import_scp(
    State(bmc): State<Shared>,
    Path(manager_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !bmc.authorized(&headers) {
        return redfish_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if manager_id != MANAGER_ID {
        return redfish_error(StatusCode::NOT_FOUND, "No such manager");
    }
    bmc.imports.lock().unwrap().push(body);
    let location = format!("/redfish/v1/TaskService/Tasks/{JOB_ID}");
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, HeaderValue::from_str(&location).unwrap())],
    )
        .into_response()
}

async fn get_job(
    State(bmc): State<Shared>,
    Path((manager_id, job_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !bmc.authorized(&headers) {
        return redfish_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if manager_id != MANAGER_ID || job_id != JOB_ID {
        return redfish_error(StatusCode::NOT_FOUND, "No such job");
    }
    bmc.job_polls.fetch_add(1, Ordering::SeqCst);
    let (state, message) = bmc.next_job_state();
    let percent = if state == "Completed" { 100 } else { 0 };
    Json(json!({
        "@odata.id": format!("/redfish/v1/Managers/{MANAGER_ID}/Jobs/{JOB_ID}"),
        "@odata.type": "#DellJob.v1_5_0.DellJob",
        "Id": JOB_ID,
        "Name": "Import Configuration",
        "JobState": state,
        "JobType": "ImportConfiguration",
        "Message": message,
        "MessageId": "SYS053",
        "PercentComplete": percent
    }))
    .into_response()
}

pub fn router(bmc: Shared) -> Router {
    Router::new()
        .route("/redfish/v1/", get(service_root))
        .route("/redfish/v1/SessionService/Sessions", post(create_session))
        .route(
            "/redfish/v1/SessionService/Sessions/{session_id}",
            delete(delete_session),
        )
        .route("/redfish/v1/Managers", get(managers))
        .route(
            "/redfish/v1/Managers/{manager_id}/Actions/Oem/EID_674_Manager.ImportSystemConfiguration",
            post(import_scp),
        )
        .route(
            "/redfish/v1/Managers/{manager_id}/Jobs/{job_id}",
            get(get_job),
        )
        .with_state(bmc)
}

/// A mock iDRAC listening on a free local port. Stops when dropped.
pub struct RunningBmc {
    pub bmc: Shared,
    pub port: u16,
    _runtime: tokio::runtime::Runtime,
}

impl RunningBmc {
    pub fn start(bmc: MockBmc) -> RunningBmc {
        let bmc = Arc::new(bmc);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = router(bmc.clone());
        runtime.spawn(async move { axum::serve(listener, app).await });
        RunningBmc {
            bmc,
            port,
            _runtime: runtime,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: "127.0.0.1".to_string(),
            port: Some(self.port),
            user: Some(USER.to_string()),
            password: Some(PASSWORD.to_string()),
        }
    }
}

/// Transport for the mock: plain HTTP and quick job polling.
pub fn pool() -> RedfishClientPool {
    RedfishClientPool::builder()
        .plain_http()
        .job_poll_interval(Duration::from_millis(5))
        .job_timeout(Duration::from_millis(300))
        .build()
        .unwrap()
}
