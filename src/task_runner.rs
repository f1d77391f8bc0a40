use crate::{
    course_models::{
        AuthenticatedUser, Course, CourseLayout, CoursePage, CoursePreview, Enrollment, Progress,
        User,
    },
    error::ApiError,
    log_util::log_debug,
    request_tracker::RequestTicket,
};
use color_eyre::{Result, eyre::WrapErr};
use std::{
    future::Future,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
};
use tokio::runtime::{Builder, Runtime};

/// Result of one background API call, tagged by the operation that produced it.
#[derive(Debug)]
pub enum TaskOutcome {
    Health(Result<String, ApiError>),
    Authenticated(Result<AuthenticatedUser, ApiError>),
    SessionRestored(Result<User, ApiError>),
    ProfileUpdated(Result<User, ApiError>),
    Layout(Result<CourseLayout, ApiError>),
    CourseCreated(Result<Course, ApiError>),
    Library(Result<Vec<Course>, ApiError>),
    CourseUpdated(Result<Course, ApiError>),
    CourseDeleted {
        course_id: String,
        result: Result<(), ApiError>,
    },
    ExplorePage(Result<CoursePage, ApiError>),
    Enrollments(Result<Vec<Enrollment>, ApiError>),
    EnrollmentUpdated(Result<Enrollment, ApiError>),
    Unenrolled {
        course_id: String,
        result: Result<(), ApiError>,
    },
    CourseLoaded(Result<Course, ApiError>),
    EnrollmentLoaded(Result<Option<Enrollment>, ApiError>),
    Enrolled(Result<Enrollment, ApiError>),
    TopicCompleted(Result<Progress, ApiError>),
    Preview(Result<CoursePreview, ApiError>),
}

impl TaskOutcome {
    /// The error carried by this outcome, if the call failed.
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Self::Health(result) => result.as_ref().err(),
            Self::Authenticated(result) => result.as_ref().err(),
            Self::SessionRestored(result) | Self::ProfileUpdated(result) => result.as_ref().err(),
            Self::Layout(result) => result.as_ref().err(),
            Self::CourseCreated(result)
            | Self::CourseUpdated(result)
            | Self::CourseLoaded(result) => result.as_ref().err(),
            Self::Library(result) => result.as_ref().err(),
            Self::CourseDeleted { result, .. } | Self::Unenrolled { result, .. } => {
                result.as_ref().err()
            }
            Self::ExplorePage(result) => result.as_ref().err(),
            Self::Enrollments(result) => result.as_ref().err(),
            Self::EnrollmentUpdated(result) | Self::Enrolled(result) => result.as_ref().err(),
            Self::EnrollmentLoaded(result) => result.as_ref().err(),
            Self::TopicCompleted(result) => result.as_ref().err(),
            Self::Preview(result) => result.as_ref().err(),
        }
    }
}

#[derive(Debug)]
pub struct TaskMessage {
    pub ticket: RequestTicket,
    pub outcome: TaskOutcome,
}

/// Runs API futures on a tokio runtime and hands their results back to the UI thread.
#[derive(Debug)]
pub struct TaskRunner {
    runtime: Runtime,
    sender: Sender<TaskMessage>,
    receiver: Receiver<TaskMessage>,
}

impl TaskRunner {
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("coursegen-api")
            .enable_all()
            .build()
            .wrap_err("Failed to build Tokio runtime")?;
        let (sender, receiver) = mpsc::channel();
        Ok(Self {
            runtime,
            sender,
            receiver,
        })
    }

    pub fn spawn<F>(&self, ticket: RequestTicket, task: F)
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        let sender = self.sender.clone();
        log_debug(&format!("TaskRunner: dispatching {:?}", ticket.kind));
        self.runtime.spawn(async move {
            let outcome = task.await;
            if sender.send(TaskMessage { ticket, outcome }).is_err() {
                log_debug("TaskRunner: UI receiver dropped before task completed");
            }
        });
    }

    /// Every message that has arrived since the last drain.
    pub fn drain(&self) -> Vec<TaskMessage> {
        let mut messages = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_tracker::{RequestKind, RequestTracker};
    use std::time::Duration;

    #[test]
    fn spawned_task_result_arrives_with_its_ticket() {
        let runner = TaskRunner::new().unwrap();
        let mut tracker = RequestTracker::new();
        let ticket = tracker.begin(RequestKind::HealthCheck).unwrap();

        runner.spawn(ticket, async { TaskOutcome::Health(Ok("ok".to_string())) });

        let message = runner
            .receiver
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(message.ticket, ticket);
        assert!(message.outcome.error().is_none());
        assert!(tracker.finish(message.ticket));
        assert!(runner.drain().is_empty());
    }

    #[test]
    fn outcome_exposes_its_error() {
        let outcome = TaskOutcome::Unenrolled {
            course_id: "c1".into(),
            result: Err(ApiError::not_signed_in()),
        };
        assert!(outcome.error().is_some_and(ApiError::is_auth_failure));
    }
}
