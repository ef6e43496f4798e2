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
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use reqwest::header::{HeaderMap, LOCATION};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    jsonmap,
    model::{
        oem::dell::{ShutdownType, SystemConfiguration},
        session::SessionCreate, Job, JobState, ODataCollection,
        ODataId,
    },
    network::{api_path, JobSettings, RedfishHttpClient, AUTH_TOKEN_HEADER},
    share::FileShare,
    Idrac, RedfishError, ScpImportRequest, ScpResponse,
};

// Used when the Managers collection is empty. Every iDRAC so far uses this id.
const DEFAULT_MANAGER_ID: &str = "iDRAC.Embedded.1";
const SESSIONS_URL: &str = "SessionService/Sessions";

pub struct Bmc {
    net: RedfishHttpClient,
    manager_id: String,
    session: Option<String>,
    liaison_share: Mutex<Option<FileShare>>,
    job_settings: JobSettings,
}

impl Bmc {
    /// Log in and discover the manager id. Issues two HTTP calls.
    pub fn new(net: RedfishHttpClient, job_settings: JobSettings) -> Result<Bmc, RedfishError> {
        let mut bmc = Bmc {
            net,
            manager_id: DEFAULT_MANAGER_ID.to_string(),
            session: None,
            liaison_share: Mutex::new(None),
            job_settings,
        };
        bmc.login()?;
        // The session is ours until the Bmc is handed out; close it on any later failure.
        if let Err(err) = bmc.set_manager_id() {
            if let Err(logout_err) = bmc.logout() {
                warn!("Failed closing session after setup error: {logout_err}");
            }
            return Err(err);
        }
        Ok(bmc)
    }
}

impl Idrac for Bmc {
    fn import_scp(&self, request: &ScpImportRequest) -> Result<ScpResponse, RedfishError> {
        let import_buffer = self.import_buffer(request)?;
        let body = SystemConfiguration {
            shutdown_type: request.shutdown_type,
            host_power_state: request.end_host_power_state,
            share_parameters: request.file.share_parameters(request.target),
            import_buffer,
        };
        let url = format!(
            "Managers/{}/Actions/Oem/EID_674_Manager.ImportSystemConfiguration",
            self.manager_id
        );
        let (_status_code, headers, _body): (_, _, Option<serde_json::Value>) =
            self.net.post(&url, body)?;
        let job_id = job_id_from_headers(&headers, &url)?;
        info!(
            "Created import job {job_id} for {} (target {})",
            request.file, request.target
        );

        if !request.job_wait {
            return Ok(job_created_response(&job_id));
        }
        let no_reboot = request.shutdown_type == ShutdownType::NoReboot;
        let job = wait_for_job(&job_id, self.job_settings, no_reboot, || self.get_job(&job_id))?;
        Ok(job_response(&job, no_reboot))
    }

    fn set_liaison_share(&self, share: FileShare) -> Result<(), RedfishError> {
        info!("Using {share} as working share");
        let mut current = self
            .liaison_share
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(share);
        Ok(())
    }

    fn liaison_share(&self) -> Option<FileShare> {
        self.liaison_share
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn logout(&self) -> Result<(), RedfishError> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        self.net.delete(session).map(|_status_code| ())?;
        info!("Closed session {session}");
        Ok(())
    }
}

impl Bmc {
    // Without a session token every request falls back to basic auth.
    fn login(&mut self) -> Result<(), RedfishError> {
        let endpoint = self.net.endpoint();
        let Some(user) = endpoint.user.clone() else {
            debug!("No BMC user given, not creating a session");
            return Ok(());
        };
        let body = SessionCreate {
            user_name: user,
            password: endpoint.password.clone().unwrap_or_default(),
        };
        let (_status_code, headers, session_body): (
            _,
            _,
            Option<serde_json::Map<String, serde_json::Value>>,
        ) = self.net.post(SESSIONS_URL, body)?;

        let token = headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let Some(token) = token else {
            warn!("BMC did not return {AUTH_TOKEN_HEADER}, using basic auth");
            return Ok(());
        };
        self.net.set_session_token(token);

        let location = match headers.get(LOCATION).and_then(|v| v.to_str().ok()) {
            Some(l) => l.to_string(),
            None => {
                let body = session_body.ok_or(RedfishError::NoContent)?;
                jsonmap::get_str(&body, "@odata.id", SESSIONS_URL)?.to_string()
            }
        };
        let session = api_path(&location);
        info!("Opened session {session}");
        self.session = Some(session);
        Ok(())
    }

    /// Fetch and set Manager id. Needed for all `Managers/{manager_id}/...` calls
    fn set_manager_id(&mut self) -> Result<(), RedfishError> {
        let (_, bmcs): (_, ODataCollection) = self.net.get("Managers")?;
        if let Some(first) = bmcs.members.first() {
            self.manager_id = first.odata_id_get()?.to_string();
        }
        debug!("Manager id {}", self.manager_id);
        Ok(())
    }

    // A local share sends the profile inline. A mounted network share is checked for the
    // file first, since otherwise the iDRAC only reports the miss once the job fails.
    fn import_buffer(&self, request: &ScpImportRequest) -> Result<Option<String>, RedfishError> {
        let Some(path) = request.file.local_path() else {
            return Ok(None);
        };
        if request.file.share.location.is_local() {
            let buffer = std::fs::read_to_string(&path)
                .map_err(|source| RedfishError::FileReadError { path, source })?;
            return Ok(Some(buffer));
        }
        if !path.is_file() {
            return Err(RedfishError::FileReadError {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "profile not found on mounted share",
                ),
                path,
            });
        }
        Ok(None)
    }

    fn get_job(&self, job_id: &str) -> Result<Job, RedfishError> {
        let url = format!("Managers/{}/Jobs/{}", self.manager_id, job_id);
        let (_status_code, job) = self.net.get(&url)?;
        Ok(job)
    }

}

// Poll until the job reaches a terminal state. A NoReboot import parks its job until someone
// reboots the host, so with `no_reboot` a job waiting for that reboot is done too.
fn wait_for_job<F>(
    job_id: &str,
    settings: JobSettings,
    no_reboot: bool,
    mut fetch: F,
) -> Result<Job, RedfishError>
where
    F: FnMut() -> Result<Job, RedfishError>,
{
    let started = Instant::now();
    loop {
        let job = fetch()?;
        debug!(
            "Job {job_id} is {} ({}%)",
            job.job_state,
            job.percent_complete.unwrap_or_default()
        );
        if job.job_state.is_terminal() {
            info!("Job {job_id} finished as {}", job.job_state);
            return Ok(job);
        }
        if no_reboot && awaits_reboot(&job) {
            info!("Job {job_id} is waiting for a host reboot");
            return Ok(job);
        }
        if started.elapsed() >= settings.timeout {
            return Err(RedfishError::JobTimeout {
                job_id: job_id.to_string(),
                timeout: settings.timeout,
                last_state: job.job_state.to_string(),
            });
        }
        thread::sleep(settings.poll_interval);
    }
}

// e.g. "No reboot Server Configuration Profile Import job scheduled, Waiting for System
// Reboot to complete the operation."
fn awaits_reboot(job: &Job) -> bool {
    !job.job_state.is_terminal()
        && job
            .message
            .as_deref()
            .is_some_and(|m| m.to_lowercase().contains("no reboot"))
}

// The job id is the last segment of the Location header, e.g.
// /redfish/v1/TaskService/Tasks/JID_467696531451
fn job_id_from_headers(headers: &HeaderMap, url: &str) -> Result<String, RedfishError> {
    let location = headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RedfishError::MissingHeader {
            header: LOCATION.to_string(),
            url: url.to_string(),
        })?;
    ODataId::from(location)
        .odata_id_get()
        .map(str::to_string)
}

fn job_created_response(job_id: &str) -> ScpResponse {
    let mut response = ScpResponse::new();
    response.insert("Status".to_string(), json!("Success"));
    response.insert("Message".to_string(), json!("Job created"));
    response.insert("JobId".to_string(), json!(job_id));
    response
}

fn job_response(job: &Job, no_reboot: bool) -> ScpResponse {
    let status = match job.job_state {
        JobState::Completed => "Success",
        _ if no_reboot && awaits_reboot(job) => "Success",
        _ => "Failed",
    };
    let mut response = ScpResponse::new();
    response.insert("Status".to_string(), json!(status));
    response.insert(
        "Message".to_string(),
        json!(job.message.as_deref().unwrap_or_default()),
    );
    if let Some(message_id) = &job.message_id {
        response.insert("MessageId".to_string(), json!(message_id));
    }
    response.insert("JobId".to_string(), json!(job.id));
    response.insert("JobState".to_string(), json!(job.job_state));
    if let Some(percent) = job.percent_complete {
        response.insert("PercentComplete".to_string(), json!(percent));
    }
    response
}

#[cfg(test)]
mod test {
    use reqwest::header::HeaderValue;

    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;
    use crate::model::ODataLinks;

    const NO_REBOOT_MSG: &str = "No reboot Server Configuration Profile Import job scheduled, \
        Waiting for System Reboot to complete the operation.";

    fn fast_settings() -> JobSettings {
        JobSettings {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        }
    }

    // Hands out the given jobs in order, repeating the last one.
    fn job_feed(jobs: Vec<Job>) -> impl FnMut() -> Result<Job, RedfishError> {
        let mut jobs: VecDeque<Job> = jobs.into();
        move || {
            let next = if jobs.len() > 1 {
                jobs.pop_front()
            } else {
                jobs.front().cloned()
            };
            next.ok_or(RedfishError::NoContent)
        }
    }

    fn job(state: JobState, message: &str) -> Job {
        Job {
            odata: ODataLinks::default(),
            id: "JID_467696531451".to_string(),
            name: Some("Import Configuration".to_string()),
            job_state: state,
            job_type: Some("ImportConfiguration".to_string()),
            message: Some(message.to_string()),
            message_id: Some("SYS053".to_string()),
            percent_complete: Some(100),
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn test_job_id_from_location() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("/redfish/v1/TaskService/Tasks/JID_467696531451"),
        );
        assert_eq!(
            job_id_from_headers(&headers, "x").unwrap(),
            "JID_467696531451"
        );

        let headers = HeaderMap::new();
        assert!(matches!(
            job_id_from_headers(&headers, "x"),
            Err(RedfishError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_completed_job_response() {
        let r = job_response(
            &job(
                JobState::Completed,
                "Successfully imported and applied Server Configuration Profile.",
            ),
            false,
        );
        assert_eq!(r["Status"], "Success");
        assert_eq!(r["JobId"], "JID_467696531451");
        assert_eq!(r["JobState"], "Completed");
        assert_eq!(r["PercentComplete"], 100);
        assert_eq!(r["MessageId"], "SYS053");
    }

    #[test]
    fn test_failed_job_response() {
        for state in [JobState::Failed, JobState::CompletedWithErrors] {
            let r = job_response(&job(state, "Unable to apply"), false);
            assert_eq!(r["Status"], "Failed");
            assert_eq!(r["Message"], "Unable to apply");
        }
    }

    #[test]
    fn test_job_created_response() {
        let r = job_created_response("JID_1");
        assert_eq!(r["Status"], "Success");
        assert_eq!(r["Message"], "Job created");
        assert_eq!(r["JobId"], "JID_1");
    }

    #[test]
    fn test_wait_for_job_until_terminal() {
        let mut polls = 0;
        let mut feed = job_feed(vec![
            job(JobState::Scheduled, "Job scheduled"),
            job(JobState::Running, "Applying"),
            job(JobState::Completed, "Successfully imported"),
        ]);
        let done = wait_for_job("JID_1", fast_settings(), false, || {
            polls += 1;
            feed()
        })
        .unwrap();
        assert_eq!(done.job_state, JobState::Completed);
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_wait_for_job_times_out() {
        let err = wait_for_job(
            "JID_1",
            fast_settings(),
            false,
            job_feed(vec![job(JobState::Running, "Applying")]),
        )
        .unwrap_err();
        match err {
            RedfishError::JobTimeout {
                job_id, last_state, ..
            } => {
                assert_eq!(job_id, "JID_1");
                assert_eq!(last_state, "Running");
            }
            other => panic!("expected JobTimeout, got {other}"),
        }
    }

    #[test]
    fn test_wait_for_job_fetch_error() {
        let err = wait_for_job("JID_1", fast_settings(), false, || {
            Err(RedfishError::NoContent)
        })
        .unwrap_err();
        assert!(matches!(err, RedfishError::NoContent));
    }

    #[test]
    fn test_no_reboot_job_stops_waiting() {
        let settings = JobSettings {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_secs(3600),
        };
        let parked = job(JobState::Scheduled, NO_REBOOT_MSG);
        let done = wait_for_job(
            "JID_1",
            settings,
            true,
            job_feed(vec![job(JobState::Running, "Applying"), parked]),
        )
        .unwrap();
        assert_eq!(done.job_state, JobState::Scheduled);

        let r = job_response(&done, true);
        assert_eq!(r["Status"], "Success");
        assert_eq!(r["Message"], NO_REBOOT_MSG);
        assert_eq!(r["JobState"], "Scheduled");
    }

    #[test]
    fn test_reboot_message_ignored_without_no_reboot() {
        let parked = job(JobState::Scheduled, NO_REBOOT_MSG);
        assert!(wait_for_job("JID_1", fast_settings(), false, job_feed(vec![parked.clone()]))
            .is_err());
        assert_eq!(job_response(&parked, false)["Status"], "Failed");
        // A failed job stays failed whatever it says
        assert_eq!(
            job_response(&job(JobState::Failed, NO_REBOOT_MSG), true)["Status"],
            "Failed"
        );
    }
}
