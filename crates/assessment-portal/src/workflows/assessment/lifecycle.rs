use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{FunnelStatus, Identity, IdentityId};
use super::error::{AssessmentError, MissingEntity};
use super::repository::{AssessmentRepository, Notifier, RepositoryError};

/// Subject and body announcing a funnel status to the applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotice {
    pub subject: String,
    pub body: String,
}

impl StatusNotice {
    pub fn for_status(status: FunnelStatus) -> Option<Self> {
        let (subject, body) = match status {
            FunnelStatus::Passed => (
                "Your assessment result",
                "Congratulations, you have passed the assessment. We will be in touch about next steps.",
            ),
            FunnelStatus::Interview => (
                "Interview invitation",
                "We would like to invite you to an interview. A member of the hiring team will contact you to schedule it.",
            ),
            FunnelStatus::Hired => (
                "Welcome aboard",
                "We are pleased to offer you the position. Details of your offer will follow shortly.",
            ),
            FunnelStatus::Rejected => (
                "Update on your application",
                "Thank you for your interest. After careful review we will not be moving forward with your application.",
            ),
            FunnelStatus::Pending | FunnelStatus::Completed | FunnelStatus::Failed => return None,
        };

        Some(Self {
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }
}

/// Owns the applicant funnel status.
///
/// Reviewers may move an applicant between any two statuses. The automatic
/// `PENDING -> COMPLETED` step is only reachable from the submission path.
pub struct StatusLifecycleManager<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
}

impl<R, N> StatusLifecycleManager<R, N>
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Reviewer-initiated transition. Notification happens after the write,
    /// only when the status actually changed, and its failure is only logged.
    pub fn set_status(
        &self,
        reviewer: &Identity,
        identity_id: &IdentityId,
        status: FunnelStatus,
    ) -> Result<Identity, AssessmentError> {
        if !reviewer.is_reviewer() {
            return Err(AssessmentError::AccessDenied);
        }

        let (previous, updated) = self
            .repository
            .update_identity_status(identity_id, status)
            .map_err(|err| match err {
                RepositoryError::NotFound => {
                    AssessmentError::NotFound(MissingEntity::Identity(identity_id.clone()))
                }
                other => AssessmentError::Repository(other),
            })?;
        info!(
            identity_id = %identity_id,
            reviewer_id = %reviewer.id,
            previous = %previous,
            status = %status,
            "funnel status updated"
        );

        if previous != status {
            self.announce(&updated, status);
        }
        Ok(updated)
    }

    /// `PENDING -> COMPLETED` after a recorded attempt. Any later status is
    /// left untouched. Returns whether the status changed.
    pub(crate) fn complete_after_submission(
        &self,
        identity_id: &IdentityId,
    ) -> Result<bool, RepositoryError> {
        let changed = self.repository.transition_status_if(
            identity_id,
            FunnelStatus::Pending,
            FunnelStatus::Completed,
        )?;
        if changed {
            info!(identity_id = %identity_id, "funnel status advanced to COMPLETED");
        }
        Ok(changed)
    }

    fn announce(&self, identity: &Identity, status: FunnelStatus) {
        let Some(notice) = StatusNotice::for_status(status) else {
            return;
        };

        if let Err(err) = self
            .notifier
            .send(&identity.email, &notice.subject, &notice.body)
        {
            warn!(
                identity_id = %identity.id,
                status = %status,
                error = %err,
                "status notification failed"
            );
        }
    }
}
