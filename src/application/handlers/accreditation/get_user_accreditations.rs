//! GetUserAccreditationsHandler - lists every accreditation of a user.

use std::sync::Arc;

use crate::domain::accreditation::{Accreditation, AccreditationError};
use crate::domain::foundation::UserId;
use crate::ports::AccreditationRepository;

use super::transition::infrastructure;

/// Query for a user's accreditations.
#[derive(Debug, Clone)]
pub struct GetUserAccreditationsQuery {
    pub user_id: UserId,
}

/// A user's accreditations, oldest first.
#[derive(Debug, Clone)]
pub struct UserAccreditations {
    pub user_id: UserId,
    pub accreditations: Vec<Accreditation>,
}

/// Handler for listing accreditations.
pub struct GetUserAccreditationsHandler {
    repository: Arc<dyn AccreditationRepository>,
}

impl GetUserAccreditationsHandler {
    pub fn new(repository: Arc<dyn AccreditationRepository>) -> Self {
        Self { repository }
    }

    /// # Errors
    ///
    /// - `UserNotFound` if the user has never submitted a request
    /// - `Internal` on storage failure
    pub async fn handle(
        &self,
        query: GetUserAccreditationsQuery,
    ) -> Result<UserAccreditations, AccreditationError> {
        let accreditations = self
            .repository
            .find_by_user(&query.user_id)
            .await
            .map_err(infrastructure("list accreditations"))?;

        if accreditations.is_empty() {
            let user = self
                .repository
                .find_user(&query.user_id)
                .await
                .map_err(infrastructure("find user"))?;
            if user.is_none() {
                return Err(AccreditationError::user_not_found(query.user_id));
            }
        }

        Ok(UserAccreditations {
            user_id: query.user_id,
            accreditations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::accreditation::test_support::{record, ScriptedRepository};
    use crate::domain::accreditation::{AccreditationStatus, User};
    use crate::domain::foundation::Timestamp;

    fn query(user: &str) -> GetUserAccreditationsQuery {
        GetUserAccreditationsQuery {
            user_id: UserId::new(user).unwrap(),
        }
    }

    #[tokio::test]
    async fn lists_only_the_requested_users_records() {
        let repo = ScriptedRepository::new()
            .with_record(record("U1", AccreditationStatus::Failed))
            .with_record(record("U1", AccreditationStatus::Pending))
            .with_record(record("U2", AccreditationStatus::Confirmed));
        let handler = GetUserAccreditationsHandler::new(Arc::new(repo));

        let result = handler.handle(query("U1")).await.unwrap();

        assert_eq!(result.accreditations.len(), 2);
        assert!(result.accreditations.iter().all(|a| a.user_id.as_str() == "U1"));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let handler = GetUserAccreditationsHandler::new(Arc::new(ScriptedRepository::new()));

        let result = handler.handle(query("ghost")).await;

        assert_eq!(
            result.unwrap_err(),
            AccreditationError::user_not_found(UserId::new("ghost").unwrap())
        );
    }

    #[tokio::test]
    async fn known_user_without_records_gets_empty_list() {
        let repo = ScriptedRepository::new();
        repo.script(|s| {
            s.users.push(User {
                key: 1,
                user_id: UserId::new("U1").unwrap(),
                created_at: Timestamp::now(),
            })
        });
        let handler = GetUserAccreditationsHandler::new(Arc::new(repo));

        let result = handler.handle(query("U1")).await.unwrap();

        assert!(result.accreditations.is_empty());
    }
}
