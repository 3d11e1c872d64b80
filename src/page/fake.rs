//! In-memory [`CheckinApi`] for component tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::delete::Confirm;
use super::submitter::SubmitControl;
use super::{PageContext, PageSettings};
use crate::api::{
    CheckinApi, CheckinReceipt, ClientResult, DeleteReceipt, NewCheckin, Project, ProjectId,
    RecentCheckin,
};
use crate::notify::Notifier;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Submit(NewCheckin),
    Project(ProjectId),
    Recent(ProjectId),
    History(String),
    Delete {
        action: String,
        fields: Vec<(String, String)>,
    },
}

/// Scripted responses per endpoint; an empty queue answers with a success
#[derive(Default)]
pub(crate) struct FakeApi {
    calls: Mutex<Vec<Call>>,
    submit: Mutex<VecDeque<ClientResult<CheckinReceipt>>>,
    projects: Mutex<VecDeque<ClientResult<Project>>>,
    recent: Mutex<VecDeque<ClientResult<Vec<RecentCheckin>>>>,
    history: Mutex<VecDeque<ClientResult<String>>>,
    delete: Mutex<VecDeque<ClientResult<DeleteReceipt>>>,
    control: Mutex<Option<watch::Receiver<SubmitControl>>>,
    control_seen: Mutex<Vec<SubmitControl>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn push_submit(&self, result: ClientResult<CheckinReceipt>) {
        self.submit.lock().unwrap().push_back(result);
    }

    pub fn push_project(&self, result: ClientResult<Project>) {
        self.projects.lock().unwrap().push_back(result);
    }

    pub fn push_recent(&self, result: ClientResult<Vec<RecentCheckin>>) {
        self.recent.lock().unwrap().push_back(result);
    }

    pub fn push_history(&self, result: ClientResult<String>) {
        self.history.lock().unwrap().push_back(result);
    }

    pub fn push_delete(&self, result: ClientResult<DeleteReceipt>) {
        self.delete.lock().unwrap().push_back(result);
    }

    /// Record the submit control's state whenever a check-in arrives
    pub fn watch_control(&self, rx: watch::Receiver<SubmitControl>) {
        *self.control.lock().unwrap() = Some(rx);
    }

    pub fn control_seen(&self) -> Vec<SubmitControl> {
        self.control_seen.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CheckinApi for FakeApi {
    async fn submit_checkin(&self, checkin: &NewCheckin) -> ClientResult<CheckinReceipt> {
        self.record(Call::Submit(checkin.clone()));
        if let Some(rx) = self.control.lock().unwrap().as_ref() {
            self.control_seen.lock().unwrap().push(rx.borrow().clone());
        }
        self.submit
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(CheckinReceipt {
                    message: None,
                    images_added: checkin.images.len() as u32,
                })
            })
    }

    async fn project(&self, project_id: ProjectId) -> ClientResult<Project> {
        self.record(Call::Project(project_id));
        self.projects.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(Project {
                id: Some(project_id),
                name: format!("Project {}", project_id),
                icon: None,
                color: None,
            })
        })
    }

    async fn recent_checkins(&self, project_id: ProjectId) -> ClientResult<Vec<RecentCheckin>> {
        self.record(Call::Recent(project_id));
        self.recent
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn history_view(&self, url: &str) -> ClientResult<String> {
        self.record(Call::History(url.to_string()));
        self.history
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    async fn delete_checkin(
        &self,
        action: &str,
        fields: &[(String, String)],
    ) -> ClientResult<DeleteReceipt> {
        self.record(Call::Delete {
            action: action.to_string(),
            fields: fields.to_vec(),
        });
        self.delete
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(DeleteReceipt::default()))
    }
}

pub(crate) fn context(api: Arc<FakeApi>) -> PageContext {
    PageContext::new(api, Notifier::default(), PageSettings::default())
}

pub(crate) fn always(answer: bool) -> Arc<dyn Confirm> {
    Arc::new(move |_: &str| answer)
}
